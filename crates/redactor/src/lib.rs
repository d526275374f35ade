//! Dual-pipeline PII detection, coreference and redaction engine.
//!
//! A document (text or a scanned image) passes through a detection stage
//! ([`text_detector`] for plain text, [`vision`] for images, fusing an
//! OCR+NER sub-pipeline with a vision-LLM detector), a review stage where
//! [`taxonomy`] decides which entity types are active, and a replacement
//! stage ([`replacement`]) that turns accepted entities into redacted output
//! via one of the [`writers`]. [`core`] wires a whole document through this
//! lifecycle; [`api`] exposes it over HTTP.

pub mod error;
pub mod types;

mod span;

pub mod taxonomy;

pub mod regex_matcher;
pub mod ner;
pub mod ocr;
pub mod vlm;

pub mod text_detector;
pub mod vision;

pub mod replacement;
pub mod writers;

pub mod core;

#[cfg(feature = "api")]
pub mod api;

pub use error::{RedactorError, RedactorWarning, Result};
