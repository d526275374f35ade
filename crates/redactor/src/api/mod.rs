//! REST API surface: health, taxonomy CRUD, and the redact/text and
//! redact/image endpoints. Gated behind the `api` feature.
//!
//! # Endpoints
//!
//! - `GET /health`
//! - `GET /taxonomy`, `POST /taxonomy`, `PUT /taxonomy/:id`, `DELETE /taxonomy/:id`
//! - `POST /taxonomy/:id/toggle`, `POST /taxonomy/reset`
//! - `POST /redact/text`, `POST /redact/image`

mod error;
mod handlers;
mod server;
mod types;

pub use error::{ApiError, ErrorResponse};
pub use server::{create_router, create_router_with_limits, serve};
pub use types::{
    ApiSizeLimits, AppState, CreateEntityTypeRequest, HealthResponse, RedactImageRequest, RedactImageResponse,
    RedactTextRequest, RedactTextResponse, TaxonomyListResponse, ToggleResponse, UpdateEntityTypeRequest,
};
