use serde::{Deserialize, Serialize};

/// Where a candidate entity was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySource {
    Regex,
    Ner,
    Manual,
}

impl EntitySource {
    /// Tie-break rank used in cross-validation: higher wins.
    pub fn rank(self) -> u8 {
        match self {
            EntitySource::Regex => 3,
            EntitySource::Ner => 2,
            EntitySource::Manual => 1,
        }
    }
}

/// A detected textual span.
///
/// `start`/`end` are half-open **character** offsets into the document, not
/// byte offsets. Invariants: `start < end <= doc.chars().count()`, `text ==
/// doc.chars().skip(start).take(end - start).collect::<String>()`, and two
/// entities sharing a `coref_id` must end up with the same `replacement`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub type_id: String,
    pub start: usize,
    pub end: usize,
    pub page: Option<u32>,
    pub confidence: f32,
    pub source: EntitySource,
    pub coref_id: Option<String>,
    pub replacement: Option<String>,
    pub selected: bool,
}

impl Entity {
    pub fn new(
        text: impl Into<String>,
        type_id: impl Into<String>,
        start: usize,
        end: usize,
        confidence: f32,
        source: EntitySource,
    ) -> Self {
        Self {
            id: String::new(),
            text: text.into(),
            type_id: type_id.into(),
            start,
            end,
            page: None,
            confidence,
            source,
            coref_id: None,
            replacement: None,
            selected: true,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_rank_ordering() {
        assert!(EntitySource::Regex.rank() > EntitySource::Ner.rank());
        assert!(EntitySource::Ner.rank() > EntitySource::Manual.rank());
    }

    #[test]
    fn test_entity_len() {
        let e = Entity::new("张三", "PERSON", 0, 2, 0.95, EntitySource::Ner);
        assert_eq!(e.len(), 2);
        assert!(!e.is_empty());
    }
}
