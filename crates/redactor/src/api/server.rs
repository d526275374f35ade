//! API server setup: router construction, CORS, and the TCP listener.
//!
//! Grounded on the teacher's `api/server.rs` `create_router`/`serve` split
//! and its environment-variable-driven CORS and body-size configuration.

use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::error::{RedactorError, Result};

use super::{handlers, types::ApiSizeLimits, types::AppState};

fn parse_size_limits_from_env() -> ApiSizeLimits {
    match std::env::var("REDACTOR_MAX_UPLOAD_SIZE_MB") {
        Ok(value) => match value.parse::<usize>() {
            Ok(mb) if mb > 0 => ApiSizeLimits::from_mb(mb),
            _ => {
                tracing::warn!("invalid REDACTOR_MAX_UPLOAD_SIZE_MB, using default 100 MB");
                ApiSizeLimits::default()
            }
        },
        Err(_) => ApiSizeLimits::default(),
    }
}

fn cors_layer_from_env() -> CorsLayer {
    match std::env::var("REDACTOR_CORS_ORIGINS") {
        Ok(origins_str) => {
            let origins: Vec<_> = origins_str
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                .collect();
            if origins.is_empty() {
                tracing::warn!(
                    "REDACTOR_CORS_ORIGINS set but empty/invalid, falling back to permissive CORS \
                     -- this permits CSRF attacks, set explicit origins for production"
                );
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                tracing::info!("CORS configured with {} explicit allowed origin(s)", origins.len());
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => {
            tracing::warn!(
                "CORS configured to allow all origins (default) -- this permits CSRF attacks, \
                 set REDACTOR_CORS_ORIGINS for production"
            );
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        }
    }
}

/// Builds the router with defaults read from the environment. Public so
/// callers can embed it in their own Axum application.
pub fn create_router(state: AppState) -> Router {
    create_router_with_limits(state, parse_size_limits_from_env())
}

pub fn create_router_with_limits(state: AppState, limits: ApiSizeLimits) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/taxonomy", get(handlers::taxonomy_list_handler).post(handlers::taxonomy_create_handler))
        .route("/taxonomy/reset", post(handlers::taxonomy_reset_handler))
        .route(
            "/taxonomy/:id",
            axum::routing::put(handlers::taxonomy_update_handler).delete(handlers::taxonomy_delete_handler),
        )
        .route("/taxonomy/:id/toggle", post(handlers::taxonomy_toggle_handler))
        .route("/redact/text", post(handlers::redact_text_handler))
        .route("/redact/image", post(handlers::redact_image_handler))
        .layer(RequestBodyLimitLayer::new(limits.max_request_body_bytes))
        .layer(cors_layer_from_env())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the server, binding to `host:port`.
pub async fn serve(host: impl AsRef<str>, port: u16, state: AppState) -> Result<()> {
    let ip: IpAddr =
        host.as_ref().parse().map_err(|e| RedactorError::invalid_input(format!("invalid host address: {e}")))?;
    let addr = SocketAddr::new(ip, port);
    let app = create_router(state);

    tracing::info!("starting redactor API server on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await.map_err(|e| RedactorError::internal(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ner::TextNerClient;
    use crate::ocr::OcrClient;
    use crate::vlm::VlmDetector;
    use std::sync::Arc;

    fn test_state() -> AppState {
        AppState {
            taxonomy: Arc::new(crate::core::TaxonomyStore::in_memory()),
            ner_client: Arc::new(TextNerClient::new("http://localhost:0")),
            ocr_client: Arc::new(OcrClient::new("http://localhost:0")),
            vlm_detector: Arc::new(VlmDetector::new("http://localhost:0")),
        }
    }

    #[test]
    fn test_create_router_builds_successfully() {
        let _router = create_router(test_state());
    }
}
