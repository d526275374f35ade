//! Data model shared across detectors, the fuser and the replacement engine.

mod bbox;
mod coref;
mod entity;

pub use bbox::{BoundingBox, BoundingBoxSource, OCRTextBlock};
pub use coref::CorefTable;
pub use entity::{Entity, EntitySource};

use serde::{Deserialize, Serialize};

/// Category from GB/T 37964-2019-style de-identification classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierCategory {
    Direct,
    Quasi,
    Sensitive,
    Other,
}

/// Replacement strategy selected per redaction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementMode {
    Smart,
    Mask,
    Custom,
    Structured,
}
