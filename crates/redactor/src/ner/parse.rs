//! Permissive JSON recovery for model responses.
//!
//! Three cascading strategies, per the detection prompt contract: direct
//! parse, regex-extracted outermost object, and object-by-object pattern
//! matching. Strategy 3 accepts truncated tails, since models often cut off
//! at `max_tokens`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{RedactorError, Result};

static OUTERMOST_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
static OUTERMOST_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// Parses `raw` as JSON, falling back to a regex-narrowed re-parse of the
/// outermost `{...}` or `[...]` span when strict parsing fails.
pub fn parse_json_payload(raw: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Ok(value);
    }

    if let Some(m) = OUTERMOST_OBJECT.find(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
            return Ok(value);
        }
    }

    if let Some(m) = OUTERMOST_ARRAY.find(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
            return Ok(value);
        }
    }

    Err(RedactorError::parse_error(format!("no JSON object or array found in model output: {raw:.200}")))
}

/// Recovers `{type -> [mention, ...]}` from an NER response, tolerating either
/// a bare object or one nested under a `{"entities": {...}}` wrapper.
pub fn parse_ner_map(raw: &str) -> Result<std::collections::HashMap<String, Vec<String>>> {
    let value = parse_json_payload(raw)?;
    let obj = value
        .as_object()
        .or_else(|| value.get("entities").and_then(Value::as_object))
        .ok_or_else(|| RedactorError::parse_error("NER response is not a JSON object"))?;

    let mut out = std::collections::HashMap::new();
    for (type_name, mentions) in obj {
        let list: Vec<String> = match mentions {
            Value::Array(arr) => arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
            Value::String(s) => vec![s.clone()],
            _ => continue,
        };
        out.insert(type_name.clone(), list);
    }
    Ok(out)
}

/// Strategy 3: extracts individual `{"type": ..., "box_2d": [...]}`-shaped
/// objects even when the surrounding array is truncated.
pub fn extract_detection_objects(raw: &str) -> Vec<Value> {
    static OBJECT_PATTERN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"(?s)\{[^{}]*"type"[^{}]*"box_2d"\s*:\s*\[[^\]]*\][^{}]*\}"#).unwrap());

    OBJECT_PATTERN.find_iter(raw).filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse_succeeds_on_clean_json() {
        let v = parse_json_payload(r#"{"PERSON": ["张三"]}"#).unwrap();
        assert_eq!(v["PERSON"][0], "张三");
    }

    #[test]
    fn test_recovers_object_embedded_in_prose() {
        let raw = "Sure, here you go:\n```json\n{\"PERSON\": [\"张三\"]}\n```\nHope that helps!";
        let v = parse_json_payload(raw).unwrap();
        assert_eq!(v["PERSON"][0], "张三");
    }

    #[test]
    fn test_fails_with_parse_error_when_no_json_present() {
        let err = parse_json_payload("no json here at all").unwrap_err();
        assert!(matches!(err, RedactorError::ParseError(_)));
    }

    #[test]
    fn test_parse_ner_map_accepts_bare_object() {
        let map = parse_ner_map(r#"{"PERSON": ["张三", "李四"], "ORG": []}"#).unwrap();
        assert_eq!(map.get("PERSON").unwrap().len(), 2);
    }

    #[test]
    fn test_extract_detection_objects_tolerates_truncated_tail() {
        let raw = r#"{"objects": [{"type": "SEAL", "text": "印章", "box_2d": [1,2,3,4]}, {"type": "PERSON", "box_2d":"#;
        let objs = extract_detection_objects(raw);
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0]["type"], "SEAL");
    }
}
