//! Ambient stack: process-wide configuration stores and the per-document
//! redaction job state machine.

pub mod config;
pub mod pipeline;

pub use config::TaxonomyStore;
pub use pipeline::{JobState, RedactionJob};
