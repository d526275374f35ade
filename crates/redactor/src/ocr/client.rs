//! Stateless HTTP client for the OCR microservice.
//!
//! Grounded on the source `OCRService`: `GET /health` for liveness,
//! `POST /ocr` with base64-encoded image bytes, returning blocks with unit
//! coordinates. No retries at this layer; the transport times out at a
//! configurable bound and upstream decides policy.

use std::time::Duration;

use base64::Engine;
use serde::Deserialize;

use crate::error::{RedactorError, Result};
use crate::types::OCRTextBlock;

const OCR_DEADLINE: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct OcrBoxResponse {
    text: String,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default = "default_label")]
    label: String,
}

fn default_confidence() -> f32 {
    0.9
}
fn default_label() -> String {
    "text".to_string()
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    boxes: Vec<OcrBoxResponse>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    ready: bool,
}

pub struct OcrClient {
    base_url: String,
    http: reqwest::Client,
}

impl OcrClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http: reqwest::Client::new() }
    }

    pub async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match tokio::time::timeout(Duration::from_secs(3), self.http.get(&url).send()).await {
            Ok(Ok(resp)) if resp.status().is_success() => {
                resp.json::<HealthResponse>().await.map(|h| h.ready).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Extracts text blocks (in unit coordinates, converted to pixel quads
    /// using the caller-supplied image dimensions) from PNG/JPEG bytes.
    pub async fn extract_text_blocks(&self, image_bytes: &[u8], width: f32, height: f32) -> Result<Vec<OCRTextBlock>> {
        if image_bytes.is_empty() {
            return Ok(Vec::new());
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let url = format!("{}/ocr", self.base_url);
        let body = serde_json::json!({ "image": encoded, "max_new_tokens": 512 });

        let response = tokio::time::timeout(OCR_DEADLINE, self.http.post(&url).json(&body).send())
            .await
            .map_err(|_| RedactorError::deadline_exceeded("OCR call exceeded 60s deadline"))??;

        let response = response.error_for_status()?;
        let parsed: OcrResponse = response.json().await?;

        Ok(parsed
            .boxes
            .into_iter()
            .map(|b| {
                let px_x = b.x * width;
                let px_y = b.y * height;
                let px_w = b.width * width;
                let px_h = b.height * height;
                OCRTextBlock {
                    text: b.text,
                    quad: [(px_x, px_y), (px_x + px_w, px_y), (px_x + px_w, px_y + px_h), (px_x, px_y + px_h)],
                    confidence: b.confidence,
                    label: b.label,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = OcrClient::new("http://localhost:8082/");
        assert_eq!(client.base_url, "http://localhost:8082");
    }
}
