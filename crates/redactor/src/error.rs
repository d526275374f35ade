//! Unified error type for the redaction engine.
//!
//! Internal code always returns `Result<T, RedactorError>`; only the `api`
//! module knows how to turn a `RedactorError` into an HTTP status code.

use thiserror::Error;

/// Error taxonomy shared by every component in the crate.
#[derive(Debug, Error)]
pub enum RedactorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("preset protected: {0}")]
    PresetProtected(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RedactorError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn preset_protected(msg: impl Into<String>) -> Self {
        Self::PresetProtected(msg.into())
    }

    pub fn upstream_unavailable(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn deadline_exceeded(msg: impl Into<String>) -> Self {
        Self::DeadlineExceeded(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<reqwest::Error> for RedactorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::DeadlineExceeded(e.to_string())
        } else {
            Self::UpstreamUnavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for RedactorError {
    fn from(e: serde_json::Error) -> Self {
        Self::ParseError(e.to_string())
    }
}

impl From<std::io::Error> for RedactorError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<regex::Error> for RedactorError {
    fn from(e: regex::Error) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RedactorError>;

/// A degraded-but-recoverable event recorded on a request instead of failing it.
///
/// Detector-stage failures (`UpstreamUnavailable`, `ParseError`, `DeadlineExceeded`)
/// are swallowed into a `warnings[]` list rather than propagated; registry errors
/// and writer `InvalidInput` errors always propagate as a hard `RedactorError`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RedactorWarning {
    pub stage: String,
    pub message: String,
}

impl RedactorWarning {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self { stage: stage.into(), message: message.into() }
    }

    pub fn from_error(stage: impl Into<String>, err: &RedactorError) -> Self {
        Self { stage: stage.into(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_produce_matching_variants() {
        assert!(matches!(RedactorError::not_found("x"), RedactorError::NotFound(_)));
        assert!(matches!(RedactorError::invalid_input("x"), RedactorError::InvalidInput(_)));
        assert!(matches!(RedactorError::preset_protected("x"), RedactorError::PresetProtected(_)));
    }

    #[test]
    fn test_warning_from_error_carries_message() {
        let err = RedactorError::upstream_unavailable("connection refused");
        let warn = RedactorWarning::from_error("ner", &err);
        assert_eq!(warn.stage, "ner");
        assert!(warn.message.contains("connection refused"));
    }
}
