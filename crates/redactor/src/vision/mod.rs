//! Vision detection: the OCR+NER sub-pipeline, the VLM sub-pipeline, and the
//! dual-pipeline fuser that combines them.

mod fuser;
mod ocr_ner_pipeline;

pub use fuser::{FusedDetection, detect};
