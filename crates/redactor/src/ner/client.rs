//! Chat-completion transport to the remote text-NER model.
//!
//! Four operations (`ner`, `hide`, `pair`, `seek`), all synchronous round
//! trips over an OpenAI-compatible `/chat/completions` endpoint. Grounded on
//! the source `HaSClient`: prompt templates, the JSON-then-regex-fallback
//! parsing, and the in-memory history-mapping merge used by `hide`.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::parse::{parse_json_payload, parse_ner_map};
use crate::error::{RedactorError, Result};

const NER_DEADLINE: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageContent,
}

#[derive(Debug, Deserialize)]
struct ChatMessageContent {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Client for the four HaS-style operations against a local or remote NER
/// model exposed over a chat-completion HTTP interface.
pub struct TextNerClient {
    base_url: String,
    http: reqwest::Client,
    history_mapping: Mutex<HashMap<String, Vec<String>>>,
}

impl TextNerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            history_mapping: Mutex::new(HashMap::new()),
        }
    }

    /// Clears the cross-chunk tag-history mapping used by `hide(use_history=true)`.
    pub fn reset_history(&self) {
        self.history_mapping.lock().clear();
    }

    async fn call(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({ "messages": messages });

        let response = tokio::time::timeout(NER_DEADLINE, self.http.post(&url).json(&body).send())
            .await
            .map_err(|_| RedactorError::deadline_exceeded("NER call exceeded 120s deadline"))??;

        let response = response.error_for_status()?;
        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RedactorError::parse_error("NER response had no choices"))
    }

    /// `ner(text, types)` — returns `{type -> [mentions]}`.
    pub async fn ner(&self, text: &str, types: &[String]) -> Result<HashMap<String, Vec<String>>> {
        let types_json = serde_json::to_string(types)?;
        let content =
            format!("Recognize the following entity types in the text.\nSpecified types:{types_json}\n<text>{text}</text>");
        let raw = self.call(vec![ChatMessage { role: "user", content }]).await?;
        parse_ner_map(&raw)
    }

    /// `hide(text, types, use_history)` — returns `(masked_text, mapping)`.
    pub async fn hide(
        &self,
        text: &str,
        types: &[String],
        use_history: bool,
    ) -> Result<(String, HashMap<String, Vec<String>>)> {
        let types_json = serde_json::to_string(types)?;
        let ner_result = self.ner(text, types).await?;
        if ner_result.values().all(|v| v.is_empty()) {
            return Ok((text.to_string(), HashMap::new()));
        }
        let ner_json = serde_json::to_string(&ner_result)?;

        let recognize_turn = ChatMessage {
            role: "user",
            content: format!(
                "Recognize the following entity types in the text.\nSpecified types:{types_json}\n<text>{text}</text>"
            ),
        };
        let echo_turn = ChatMessage { role: "assistant", content: ner_json };

        let history_snapshot = self.history_mapping.lock().clone();
        let replace_turn = if use_history && !history_snapshot.is_empty() {
            let history_json = serde_json::to_string(&history_snapshot)?;
            ChatMessage {
                role: "user",
                content: format!("Replace the above-mentioned entity types in the text according to the existing mapping pairs:{history_json}"),
            }
        } else {
            ChatMessage { role: "user", content: "Replace the above-mentioned entity types in the text.".to_string() }
        };

        let masked_text = self.call(vec![recognize_turn, echo_turn, replace_turn]).await?;
        let mapping = self.pair(text, &masked_text).await?;

        let mut history = self.history_mapping.lock();
        for (tag, values) in &mapping {
            let entry = history.entry(tag.clone()).or_default();
            for v in values {
                if !entry.contains(v) {
                    entry.push(v.clone());
                }
            }
        }

        Ok((masked_text, mapping))
    }

    /// `pair(original, anonymized)` — recovers `{tag -> [originals]}`.
    pub async fn pair(&self, original: &str, anonymized: &str) -> Result<HashMap<String, Vec<String>>> {
        let content = format!(
            "<original>{original}</original>\n<anonymized>{anonymized}</anonymized>\nExtract the mapping from anonymized entities to original entities."
        );
        let raw = self.call(vec![ChatMessage { role: "user", content }]).await?;
        parse_ner_map(&raw)
    }

    /// `seek(masked, mapping)` — single-turn restoration; not on the
    /// detection critical path, used for round-trip testing.
    pub async fn seek(&self, masked_text: &str, mapping: Option<&HashMap<String, Vec<String>>>) -> Result<String> {
        let owned_history;
        let use_mapping = match mapping {
            Some(m) => m,
            None => {
                owned_history = self.history_mapping.lock().clone();
                &owned_history
            }
        };
        if use_mapping.is_empty() {
            return Ok(masked_text.to_string());
        }
        let mapping_json = serde_json::to_string(use_mapping)?;
        let content = format!(
            "The mapping from anonymized entities to original entities:\n{mapping_json}\nRestore the original text based on the above mapping:\n{masked_text}"
        );
        self.call(vec![ChatMessage { role: "user", content }]).await
    }

    /// Liveness probe distinct from the per-operation deadline: tries the
    /// OpenAI-style `/models` endpoint first, then a bare `/health` endpoint.
    pub async fn is_available(&self) -> bool {
        let probe_timeout = Duration::from_secs(5);

        let models_url = format!("{}/models", self.base_url);
        if let Ok(Ok(resp)) = tokio::time::timeout(probe_timeout, self.http.get(&models_url).send()).await {
            if resp.status().is_success() {
                return true;
            }
        }

        let health_base = self.base_url.trim_end_matches("/v1");
        let health_url = format!("{health_base}/health");
        matches!(
            tokio::time::timeout(probe_timeout, self.http.get(&health_url).send()).await,
            Ok(Ok(resp)) if resp.status().is_success()
        )
    }
}

/// Strict response shape for the detection prompt (§4.6), parsed via the
/// cascading `parse_json_payload`/`extract_detection_objects` strategies
/// rather than a hand-rolled ad hoc parser.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionObject {
    #[serde(rename = "type")]
    pub type_label: String,
    #[serde(default)]
    pub text: Option<String>,
    pub box_2d: Vec<f32>,
}

pub fn parse_detection_objects(raw: &str) -> Vec<DetectionObject> {
    if let Ok(value) = parse_json_payload(raw) {
        if let Some(objects) = value.get("objects").and_then(Value::as_array) {
            let parsed: Vec<DetectionObject> =
                objects.iter().filter_map(|o| serde_json::from_value(o.clone()).ok()).collect();
            if !parsed.is_empty() {
                return parsed;
            }
        }
    }

    super::parse::extract_detection_objects(raw)
        .into_iter()
        .filter_map(|o| serde_json::from_value(o).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detection_objects_from_wrapped_json() {
        let raw = r#"{"objects": [{"type": "SEAL", "text": "印章", "box_2d": [10,20,30,40]}]}"#;
        let objs = parse_detection_objects(raw);
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0].type_label, "SEAL");
        assert_eq!(objs[0].box_2d, vec![10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_parse_detection_objects_falls_back_to_truncated_strategy() {
        let raw = r#"garbage prefix {"type": "PERSON", "box_2d": [1,2,3,4]} trailing junk {"#;
        let objs = parse_detection_objects(raw);
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0].type_label, "PERSON");
    }

    #[test]
    fn test_reset_history_clears_mapping() {
        let client = TextNerClient::new("http://localhost:8000/v1");
        client.history_mapping.lock().insert("TAG".to_string(), vec!["value".to_string()]);
        client.reset_history();
        assert!(client.history_mapping.lock().is_empty());
    }
}
