//! API error handling: the sole place `RedactorError` is turned into an
//! HTTP status code. Grounded on the teacher's `api/error.rs`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::RedactorError;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error_kind: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error: RedactorError) -> Self {
        let error_kind = match &error {
            RedactorError::NotFound(_) => "NotFound",
            RedactorError::InvalidInput(_) => "InvalidInput",
            RedactorError::PresetProtected(_) => "PresetProtected",
            RedactorError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            RedactorError::ParseError(_) => "ParseError",
            RedactorError::DeadlineExceeded(_) => "DeadlineExceeded",
            RedactorError::Internal(_) => "Internal",
        };
        Self {
            status,
            body: ErrorResponse { error_kind: error_kind.to_string(), message: error.to_string(), status_code: status.as_u16() },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// `NotFound`->404, `InvalidInput`/`PresetProtected`->400, `UpstreamUnavailable`->502,
/// `ParseError`->422 (following the teacher's `Parsing`->422 precedent: it means
/// "upstream returned something we couldn't parse", not a caller mistake),
/// `DeadlineExceeded`->504, `Internal`->500.
impl From<RedactorError> for ApiError {
    fn from(error: RedactorError) -> Self {
        let status = match &error {
            RedactorError::NotFound(_) => StatusCode::NOT_FOUND,
            RedactorError::InvalidInput(_) | RedactorError::PresetProtected(_) => StatusCode::BAD_REQUEST,
            RedactorError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            RedactorError::ParseError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RedactorError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            RedactorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let api_err: ApiError = RedactorError::not_found("x").into();
        assert_eq!(api_err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parse_error_maps_to_422_not_400() {
        let api_err: ApiError = RedactorError::parse_error("bad json").into();
        assert_eq!(api_err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_upstream_unavailable_maps_to_502() {
        let api_err: ApiError = RedactorError::upstream_unavailable("down").into();
        assert_eq!(api_err.status, StatusCode::BAD_GATEWAY);
    }
}
