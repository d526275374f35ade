//! OCR client plus the table-expansion helper used by the OCR+NER sub-pipeline.

mod client;
mod table;

pub use client::OcrClient;
pub use table::expand_table_block;
