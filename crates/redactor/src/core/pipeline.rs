//! Document redaction job state machine:
//! `Uploaded -> Parsed -> Detected -> Reviewed -> Redacted -> Delivered`.
//!
//! Only the `Detected -> Reviewed -> Redacted` edges involve the core; the
//! prior edges belong to the caller's upload/parse step. Grounded on
//! `redactor.py`'s per-document driver object that owns the CorefTable and
//! entity/box lists across the review step.

use std::collections::HashMap;

use crate::error::{RedactorError, RedactorWarning, Result};
use crate::replacement::{ComparisonEntry, ReplacementEngine};
use crate::taxonomy::TaxonomyRegistry;
use crate::types::{BoundingBox, CorefTable, Entity, ReplacementMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Uploaded,
    Parsed,
    Detected,
    Reviewed,
    Redacted,
    Delivered,
}

/// Drives one document through its redaction lifecycle, owning the
/// per-document CorefTable and the entity/box lists produced by detection.
pub struct RedactionJob {
    state: JobState,
    pub entities: Vec<Entity>,
    pub boxes: Vec<BoundingBox>,
    pub warnings: Vec<RedactorWarning>,
    coref: CorefTable,
    replacement_engine: ReplacementEngine,
    entity_map: HashMap<String, String>,
    comparison: Vec<ComparisonEntry>,
}

impl RedactionJob {
    pub fn new() -> Self {
        Self {
            state: JobState::Uploaded,
            entities: Vec::new(),
            boxes: Vec::new(),
            warnings: Vec::new(),
            coref: CorefTable::new(),
            replacement_engine: ReplacementEngine::new(),
            entity_map: HashMap::new(),
            comparison: Vec::new(),
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn require(&self, expected: JobState) -> Result<()> {
        if self.state != expected {
            return Err(RedactorError::invalid_input(format!(
                "job is in state {:?}, expected {:?}",
                self.state, expected
            )));
        }
        Ok(())
    }

    /// `Uploaded -> Parsed`: the caller hands off parsed document content;
    /// this core doesn't re-derive it, so the edge is just a state bump.
    pub fn mark_parsed(&mut self) -> Result<()> {
        self.require(JobState::Uploaded)?;
        self.state = JobState::Parsed;
        Ok(())
    }

    /// `Parsed -> Detected`: records whatever the text/vision detectors
    /// produced for this document.
    pub fn record_detection(&mut self, entities: Vec<Entity>, boxes: Vec<BoundingBox>, warnings: Vec<RedactorWarning>) -> Result<()> {
        self.require(JobState::Parsed)?;
        self.entities = entities;
        self.boxes = boxes;
        self.warnings = warnings;
        self.state = JobState::Detected;
        Ok(())
    }

    /// `Detected -> Reviewed`: the user selects which spans/boxes apply
    /// (reflected by each entity's/box's `selected` flag, already set by the
    /// caller before this call) and the engine resolves replacements and a
    /// comparison summary over the selected subset.
    pub fn review(&mut self, mode: ReplacementMode, registry: &TaxonomyRegistry, custom_map: Option<&HashMap<String, String>>) -> Result<&[ComparisonEntry]> {
        self.require(JobState::Detected)?;
        let selected: Vec<Entity> = self.entities.iter().filter(|e| e.selected).cloned().collect();
        let (entity_map, comparison) =
            self.replacement_engine.resolve_all(&selected, mode, registry, &mut self.coref, custom_map);
        self.entity_map = entity_map;
        self.comparison = comparison;
        self.state = JobState::Reviewed;
        Ok(&self.comparison)
    }

    /// `Reviewed -> Redacted`: exposes the resolved `entity_map` and selected
    /// boxes for a writer adapter to consume; the core stops short of
    /// invoking a specific writer since that choice belongs to the caller.
    pub fn finalize(&mut self) -> Result<(&HashMap<String, String>, &[BoundingBox])> {
        self.require(JobState::Reviewed)?;
        self.state = JobState::Redacted;
        Ok((&self.entity_map, &self.boxes))
    }

    /// `Redacted -> Delivered`: the writer has produced output bytes; this
    /// just closes out the state machine.
    pub fn mark_delivered(&mut self) -> Result<()> {
        self.require(JobState::Redacted)?;
        self.state = JobState::Delivered;
        Ok(())
    }
}

impl Default for RedactionJob {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntitySource;

    #[test]
    fn test_full_lifecycle_advances_through_every_state() {
        let registry = TaxonomyRegistry::with_presets();
        let mut job = RedactionJob::new();
        job.mark_parsed().unwrap();
        let entity = Entity::new("张三", "PERSON", 0, 2, 0.9, EntitySource::Ner);
        job.record_detection(vec![entity], vec![], vec![]).unwrap();
        job.review(ReplacementMode::Smart, &registry, None).unwrap();
        let (map, _) = job.finalize().unwrap();
        assert_eq!(map.get("张三"), Some(&"[当事人一]".to_string()));
        job.mark_delivered().unwrap();
        assert_eq!(job.state(), JobState::Delivered);
    }

    #[test]
    fn test_out_of_order_transition_is_rejected() {
        let mut job = RedactionJob::new();
        assert!(job.record_detection(vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn test_review_only_applies_selected_entities() {
        let registry = TaxonomyRegistry::with_presets();
        let mut job = RedactionJob::new();
        job.mark_parsed().unwrap();
        let mut kept = Entity::new("张三", "PERSON", 0, 2, 0.9, EntitySource::Ner);
        kept.selected = true;
        let mut dropped = Entity::new("李四", "PERSON", 10, 12, 0.9, EntitySource::Ner);
        dropped.selected = false;
        job.record_detection(vec![kept, dropped], vec![], vec![]).unwrap();
        job.review(ReplacementMode::Smart, &registry, None).unwrap();
        let (map, _) = job.finalize().unwrap();
        assert!(map.contains_key("张三"));
        assert!(!map.contains_key("李四"));
    }
}
