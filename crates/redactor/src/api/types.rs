//! API request and response types.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::TaxonomyStore;
use crate::ner::TextNerClient;
use crate::ocr::OcrClient;
use crate::replacement::ComparisonEntry;
use crate::taxonomy::{EntityTypeConfig, EntityTypeUpdate};
use crate::types::{BoundingBox, IdentifierCategory, ReplacementMode};
use crate::vlm::VlmDetector;

/// API server size limit configuration, mirroring the teacher's
/// `ApiSizeLimits`: controls request-body and multipart-field ceilings.
#[derive(Debug, Clone, Copy)]
pub struct ApiSizeLimits {
    pub max_request_body_bytes: usize,
}

impl Default for ApiSizeLimits {
    fn default() -> Self {
        Self { max_request_body_bytes: 100 * 1024 * 1024 }
    }
}

impl ApiSizeLimits {
    pub fn from_mb(max_request_body_mb: usize) -> Self {
        Self { max_request_body_bytes: max_request_body_mb * 1024 * 1024 }
    }
}

/// Shared server state: the taxonomy store plus the three detector
/// transports, each cheap to clone (an `Arc`-backed client or store handle).
#[derive(Clone)]
pub struct AppState {
    pub taxonomy: Arc<TaxonomyStore>,
    pub ner_client: Arc<TextNerClient>,
    pub ocr_client: Arc<OcrClient>,
    pub vlm_detector: Arc<VlmDetector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub type TaxonomyListResponse = Vec<EntityTypeConfig>;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntityTypeRequest {
    pub name: String,
    pub category: IdentifierCategory,
    pub description: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default = "default_color")]
    pub color: String,
    pub regex_pattern: Option<String>,
    #[serde(default = "default_true")]
    pub use_llm: bool,
    pub tag_template: Option<String>,
}

fn default_color() -> String {
    "#6B7280".to_string()
}
fn default_true() -> bool {
    true
}

pub type UpdateEntityTypeRequest = EntityTypeUpdate;

#[derive(Debug, Clone, Serialize)]
pub struct ToggleResponse {
    pub id: String,
    pub enabled: bool,
}

/// Request body for `POST /redact/text`. `enabled_type_ids` defaults to every
/// enabled taxonomy entry when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct RedactTextRequest {
    pub text: String,
    #[serde(default = "default_mode")]
    pub mode: ReplacementMode,
    pub enabled_type_ids: Option<Vec<String>>,
    pub custom_map: Option<HashMap<String, String>>,
}

fn default_mode() -> ReplacementMode {
    ReplacementMode::Smart
}

#[derive(Debug, Clone, Serialize)]
pub struct RedactTextResponse {
    pub redacted_text: String,
    pub entity_map: HashMap<String, String>,
    pub comparison: Vec<ComparisonEntry>,
}

/// Request body for `POST /redact/image`. The image is base64-encoded since
/// this is a thin JSON surface, not a multipart upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RedactImageRequest {
    pub image_base64: String,
    pub width: f32,
    pub height: f32,
    pub ocr_enabled_type_ids: Option<Vec<String>>,
    pub vlm_enabled_type_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedactImageResponse {
    pub boxes: Vec<BoundingBox>,
}
