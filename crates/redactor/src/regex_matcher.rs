//! Deterministic regex-based detection.
//!
//! Each enabled type's compiled pattern is scanned for non-overlapping
//! matches. A small built-in fallback table of lower-priority patterns
//! (grounded on the source's separate `RegexService.BUILTIN_PATTERNS` catalog)
//! backs types whose taxonomy pattern misses a format variant; it is not
//! registry-visible.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::span::ByteToChar;
use crate::taxonomy::TaxonomyRegistry;
use crate::types::{Entity, EntitySource};

/// A single fallback pattern with a priority used to resolve overlaps within
/// one type (higher priority wins).
struct FallbackPattern {
    regex: Regex,
    priority: i32,
}

static BUILTIN_FALLBACKS: Lazy<HashMap<&'static str, Vec<FallbackPattern>>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, Vec<FallbackPattern>> = HashMap::new();
    map.insert(
        "PHONE",
        vec![
            FallbackPattern { regex: Regex::new(r"\b1[3-9]\d{9}\b").unwrap(), priority: 10 },
            FallbackPattern {
                regex: Regex::new(r"\b(?:0\d{2,3}[-\s]?)?\d{7,8}\b").unwrap(),
                priority: 5,
            },
        ],
    );
    map.insert(
        "ID_CARD",
        vec![FallbackPattern {
            regex: Regex::new(r"\b[1-9]\d{5}\d{2}(?:0[1-9]|1[0-2])(?:0[1-9]|[12]\d|3[01])\d{3}\b").unwrap(),
            priority: 9,
        }],
    );
    map
});

struct RawMatch {
    start: usize,
    end: usize,
    priority: i32,
}

/// Scans `document` for every enabled type in `enabled_type_ids`, returning
/// non-overlapping `Entity` values sourced from regex matches.
///
/// Overlap *within* a type is resolved here by priority then left-most-longest;
/// overlap *across* types is left to the hybrid detector's cross-validation.
pub fn extract(document: &str, registry: &TaxonomyRegistry, enabled_type_ids: &[String]) -> Vec<Entity> {
    let mut out = Vec::new();
    let byte_to_char = ByteToChar::new(document);

    for type_id in enabled_type_ids {
        let Ok(config) = registry.get(type_id) else { continue };
        if !config.enabled {
            continue;
        }
        let Some(pattern) = &config.regex_pattern else { continue };
        let Ok(primary) = Regex::new(pattern) else { continue };

        let mut candidates: Vec<RawMatch> = primary
            .find_iter(document)
            .map(|m| RawMatch { start: m.start(), end: m.end(), priority: 100 })
            .collect();

        if let Some(fallbacks) = BUILTIN_FALLBACKS.get(type_id.as_str()) {
            for fallback in fallbacks {
                for m in fallback.regex.find_iter(document) {
                    candidates.push(RawMatch { start: m.start(), end: m.end(), priority: fallback.priority });
                }
            }
        }

        candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.priority.cmp(&a.priority)).then(b.end.cmp(&a.end)));

        let mut last_end = 0usize;
        for candidate in candidates {
            if candidate.start < last_end {
                continue;
            }
            let text = &document[candidate.start..candidate.end];
            let confidence = confidence_for(type_id);
            let (char_start, char_end) = byte_to_char.char_span(candidate.start, candidate.end);
            let mut entity = Entity::new(text, type_id, char_start, char_end, confidence, EntitySource::Regex);
            entity.id = format!("regex_{type_id}_{char_start}_{char_end}");
            out.push(entity);
            last_end = candidate.end;
        }
    }

    out.sort_by_key(|e| e.start);
    out
}

fn confidence_for(type_id: &str) -> f32 {
    match type_id {
        "ID_CARD" | "EMAIL" | "PHONE" => 0.99,
        "BANK_CARD" => 0.95,
        "CASE_NUMBER" | "LICENSE_PLATE" | "DATE" => 0.95,
        _ => 0.9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_scenario_a_phone_alone() {
        let registry = TaxonomyRegistry::with_presets();
        let doc = "联系电话：13812345678。";
        let entities = extract(doc, &registry, &["PHONE".to_string()]);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "13812345678");
        assert_eq!(entities[0].type_id, "PHONE");
        assert_eq!(entities[0].source, EntitySource::Regex);
        assert_eq!(entities[0].start, 5);
        assert_eq!(entities[0].end, 16);
    }

    #[test]
    fn test_non_overlapping_within_type() {
        let registry = TaxonomyRegistry::with_presets();
        let doc = "ID:110101199003071234 end";
        let entities = extract(doc, &registry, &["ID_CARD".to_string()]);
        assert_eq!(entities.len(), 1);
    }

    #[test]
    fn test_disabled_type_is_skipped() {
        let mut registry = TaxonomyRegistry::with_presets();
        registry.toggle("PHONE").unwrap();
        let doc = "13812345678";
        let entities = extract(doc, &registry, &["PHONE".to_string()]);
        assert!(entities.is_empty());
    }

    #[test]
    fn test_unknown_type_id_is_ignored() {
        let registry = TaxonomyRegistry::with_presets();
        let entities = extract("anything", &registry, &["NOT_A_TYPE".to_string()]);
        assert!(entities.is_empty());
    }
}
