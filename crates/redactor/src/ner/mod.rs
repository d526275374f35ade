//! Text-NER client: chat-completion transport exposing `ner`/`hide`/`pair`/`seek`.

mod client;
mod parse;

pub use client::{DetectionObject, TextNerClient, parse_detection_objects};
pub use parse::{extract_detection_objects, parse_json_payload, parse_ner_map};
