//! Client for the optional MCP sidecar proxy: EXIF correction, compression,
//! coordinate conversion and box drawing offloaded to a local service.
//!
//! The proxy is probed every 15s on a background task; the hot path reads an
//! `AtomicBool` rather than taking a lock or blocking on a fresh probe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::{RedactorError, Result};
use crate::types::{BoundingBox, BoundingBoxSource};

const HEALTH_PROBE_INTERVAL: Duration = Duration::from_secs(15);
const HEALTH_PROBE_DEADLINE: Duration = Duration::from_secs(2);
const DETECT_DEADLINE: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct ProxyBox {
    #[serde(rename = "type")]
    type_id: String,
    #[serde(default)]
    text: Option<String>,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    0.8
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    boxes: Vec<ProxyBox>,
    #[serde(default)]
    #[allow(dead_code)]
    image_width: Option<f32>,
    #[serde(default)]
    #[allow(dead_code)]
    image_height: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct DrawResponse {
    result_image: String,
}

/// Client plus liveness state for the MCP sidecar.
pub struct McpProxyClient {
    base_url: String,
    http: reqwest::Client,
    available: Arc<AtomicBool>,
}

impl McpProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            available: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `true` if the last background probe succeeded. Never blocks.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    async fn probe_once(http: &reqwest::Client, base_url: &str) -> bool {
        let url = format!("{base_url}/health");
        matches!(
            tokio::time::timeout(HEALTH_PROBE_DEADLINE, http.get(&url).send()).await,
            Ok(Ok(resp)) if resp.status().is_success()
        )
    }

    /// Spawns the background probe loop. The returned handle can be dropped
    /// to leave the task detached for the lifetime of the process, or aborted
    /// explicitly by the caller.
    pub fn spawn_health_probe(&self) -> tokio::task::JoinHandle<()> {
        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let available = self.available.clone();
        tokio::spawn(async move {
            loop {
                let ok = Self::probe_once(&http, &base_url).await;
                available.store(ok, Ordering::Relaxed);
                tokio::time::sleep(HEALTH_PROBE_INTERVAL).await;
            }
        })
    }

    /// Sends `image_bytes` plus the enabled type ids for detection. Returns
    /// unit-coordinate boxes already converted by the proxy.
    pub async fn detect(&self, image_bytes: &[u8], type_ids: &[String]) -> Result<Vec<BoundingBox>> {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let url = format!("{}/mcp/detect", self.base_url);
        let body = json!({ "image": encoded, "types": type_ids });

        let response = tokio::time::timeout(DETECT_DEADLINE, self.http.post(&url).json(&body).send())
            .await
            .map_err(|_| RedactorError::deadline_exceeded("MCP detect call exceeded 300s deadline"))??;

        let response = response.error_for_status()?;
        let parsed: DetectResponse = response.json().await?;

        Ok(parsed
            .boxes
            .into_iter()
            .map(|b| {
                let mut bbox = BoundingBox::new(b.type_id, b.x, b.y, b.width, b.height, BoundingBoxSource::GlmVision, b.confidence);
                bbox.text = b.text;
                bbox
            })
            .collect())
    }

    /// Requests the proxy draw redaction boxes onto `image_bytes`, returning
    /// the resulting PNG bytes.
    pub async fn draw(&self, image_bytes: &[u8], boxes: &[BoundingBox]) -> Result<Vec<u8>> {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let url = format!("{}/mcp/draw", self.base_url);
        let body = json!({ "image": encoded, "boxes": boxes });

        let response = tokio::time::timeout(DETECT_DEADLINE, self.http.post(&url).json(&body).send())
            .await
            .map_err(|_| RedactorError::deadline_exceeded("MCP draw call exceeded 300s deadline"))??;

        let response = response.error_for_status()?;
        let parsed: DrawResponse = response.json().await?;
        base64::engine::general_purpose::STANDARD
            .decode(parsed.result_image)
            .map_err(|e| RedactorError::parse_error(format!("MCP draw returned invalid base64: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = McpProxyClient::new("http://localhost:9000/");
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_unavailable_until_probed() {
        let client = McpProxyClient::new("http://localhost:9000");
        assert!(!client.is_available());
    }
}
