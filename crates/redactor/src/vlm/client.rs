//! VLM detection client: proxy mode when the MCP sidecar is reachable,
//! direct chat-completion mode otherwise.
//!
//! Grounded on the source `glm_client.GLMClient`: image compression to
//! max-side 2048 at JPEG quality 85, multimodal chat-completion payload, and
//! the three-strategy JSON recovery used for detection objects.

use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use image::ImageFormat;
use image::imageops::FilterType;
use serde::Serialize;
use serde_json::json;

use super::coord::{RawBox, normalize_boxes};
use super::mcp_proxy::McpProxyClient;
use super::prompt::{build_detection_prompt, normalize_type_label};
use crate::error::{RedactorError, Result};
use crate::ner::{DetectionObject, parse_detection_objects};
use crate::taxonomy::EntityTypeConfig;
use crate::types::BoundingBox;

const VLM_DEADLINE: Duration = Duration::from_secs(300);
const MAX_SIDE: u32 = 2048;
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Serialize)]
struct ContentPart {
    #[serde(rename = "type")]
    part_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<ImageUrl>,
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, serde::Deserialize)]
struct ChatChoice {
    message: ChatMessageContent,
}
#[derive(Debug, serde::Deserialize)]
struct ChatMessageContent {
    content: String,
}
#[derive(Debug, serde::Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Resizes to max-side 2048 if larger, then re-encodes as JPEG-85.
fn compress_image(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let img = image::load_from_memory(bytes).map_err(|e| RedactorError::invalid_input(format!("unreadable image: {e}")))?;
    let (w, h) = (img.width(), img.height());
    let scale = (MAX_SIDE as f32 / w.max(h) as f32).min(1.0);
    let (out_w, out_h) = ((w as f32 * scale) as u32, (h as f32 * scale) as u32);
    let resized = if scale < 1.0 { img.resize(out_w.max(1), out_h.max(1), FilterType::Lanczos3) } else { img };

    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut Cursor::new(&mut buf), JPEG_QUALITY);
    encoder
        .encode_image(&resized)
        .map_err(|e| RedactorError::internal(format!("jpeg encode failed: {e}")))?;
    Ok((buf, resized.width(), resized.height()))
}

/// VLM detector that prefers the MCP proxy when its background health probe
/// is currently green, falling back to direct chat-completion otherwise.
pub struct VlmDetector {
    base_url: String,
    http: reqwest::Client,
    proxy: Option<McpProxyClient>,
}

impl VlmDetector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http: reqwest::Client::new(), proxy: None }
    }

    /// Attaches an MCP proxy and spawns its background health probe.
    pub fn with_proxy(mut self, proxy_base_url: impl Into<String>) -> Self {
        let proxy = McpProxyClient::new(proxy_base_url);
        proxy.spawn_health_probe();
        self.proxy = Some(proxy);
        self
    }

    /// Detects regions in `image_bytes` for the given enabled types, routing
    /// through the proxy when reachable and falling back to direct mode.
    pub async fn detect(&self, image_bytes: &[u8], enabled_types: &[&EntityTypeConfig]) -> Result<Vec<BoundingBox>> {
        if let Some(proxy) = &self.proxy {
            if proxy.is_available() {
                let type_ids: Vec<String> = enabled_types.iter().map(|t| t.id.clone()).collect();
                return proxy.detect(image_bytes, &type_ids).await;
            }
        }
        self.detect_direct(image_bytes, enabled_types).await
    }

    async fn detect_direct(&self, image_bytes: &[u8], enabled_types: &[&EntityTypeConfig]) -> Result<Vec<BoundingBox>> {
        let (compressed, width, height) = compress_image(image_bytes)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&compressed);
        let data_url = format!("data:image/jpeg;base64,{encoded}");

        let prompt = build_detection_prompt(enabled_types);
        let messages = json!([{
            "role": "user",
            "content": [
                ContentPart { part_type: "image_url", text: None, image_url: Some(ImageUrl { url: data_url }) },
                ContentPart { part_type: "text", text: Some(prompt), image_url: None },
            ],
        }]);

        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({ "messages": messages });

        let response = tokio::time::timeout(VLM_DEADLINE, self.http.post(&url).json(&body).send())
            .await
            .map_err(|_| RedactorError::deadline_exceeded("VLM call exceeded 300s deadline"))??;

        let response = response.error_for_status()?;
        let parsed: ChatCompletionResponse = response.json().await?;
        let raw_content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RedactorError::parse_error("VLM response had no choices"))?;

        let objects = parse_detection_objects(&raw_content);
        Ok(objects_to_boxes(&objects, width as f32, height as f32))
    }
}

fn objects_to_boxes(objects: &[DetectionObject], width: f32, height: f32) -> Vec<BoundingBox> {
    let raw: Vec<(String, Option<String>, RawBox)> = objects
        .iter()
        .filter_map(|o| {
            if o.box_2d.len() != 4 {
                return None;
            }
            let type_id = normalize_type_label(&o.type_label)?;
            Some((
                type_id.to_string(),
                o.text.clone(),
                RawBox { x1: o.box_2d[0], y1: o.box_2d[1], x2: o.box_2d[2], y2: o.box_2d[3] },
            ))
        })
        .collect();

    normalize_boxes(&raw, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objects_to_boxes_skips_unrecognized_labels() {
        let objects = vec![DetectionObject { type_label: "nonsense".into(), text: None, box_2d: vec![1.0, 2.0, 3.0, 4.0] }];
        let boxes = objects_to_boxes(&objects, 1000.0, 1000.0);
        assert!(boxes.is_empty());
    }

    #[test]
    fn test_objects_to_boxes_carries_caption_text() {
        let objects =
            vec![DetectionObject { type_label: "公章".into(), text: Some("cap".into()), box_2d: vec![50.0, 50.0, 450.0, 250.0] }];
        let boxes = objects_to_boxes(&objects, 2000.0, 1500.0);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].text.as_deref(), Some("cap"));
        assert_eq!(boxes[0].type_id, "SEAL");
    }

    #[test]
    fn test_caption_stays_attached_when_a_middle_box_is_junk_filtered() {
        let objects = vec![
            DetectionObject { type_label: "公章".into(), text: Some("capA".into()), box_2d: vec![100.0, 100.0, 300.0, 300.0] },
            // Degenerate box (x1 == x2): dropped by normalize_boxes, not by the input filter.
            DetectionObject { type_label: "公章".into(), text: Some("capB".into()), box_2d: vec![500.0, 500.0, 500.0, 600.0] },
            DetectionObject { type_label: "公章".into(), text: Some("capC".into()), box_2d: vec![600.0, 600.0, 800.0, 800.0] },
        ];
        let boxes = objects_to_boxes(&objects, 1000.0, 1000.0);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].text.as_deref(), Some("capA"));
        assert_eq!(boxes[1].text.as_deref(), Some("capC"));
    }
}
