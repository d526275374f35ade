//! In-memory catalog of entity types: presets shipped with the binary plus
//! user-created entries, all mutable except that presets cannot be deleted.

mod presets;

pub use presets::preset_tables;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RedactorError, Result};
use crate::types::IdentifierCategory;

/// A single entry in the taxonomy registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTypeConfig {
    pub id: String,
    pub name: String,
    pub category: IdentifierCategory,
    pub description: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default = "default_color")]
    pub color: String,
    pub regex_pattern: Option<String>,
    #[serde(default = "default_true")]
    pub use_llm: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_order")]
    pub order: i32,
    pub tag_template: Option<String>,
    #[serde(default = "default_risk_level")]
    pub risk_level: u8,
    /// `false` for presets shipped with the binary; `true` for user-created
    /// entries. Presets may be disabled but never deleted.
    #[serde(default)]
    pub is_preset: bool,
}

fn default_color() -> String {
    "#6B7280".to_string()
}
fn default_true() -> bool {
    true
}
fn default_order() -> i32 {
    100
}
fn default_risk_level() -> u8 {
    3
}

impl EntityTypeConfig {
    /// `regex_pattern` absent implies `use_llm` must be true.
    pub fn validate(&self) -> Result<()> {
        if self.regex_pattern.is_none() && !self.use_llm {
            return Err(RedactorError::invalid_input(format!(
                "entity type '{}' has no regex_pattern and use_llm=false",
                self.id
            )));
        }
        if let Some(pattern) = &self.regex_pattern {
            regex::Regex::new(pattern)?;
        }
        Ok(())
    }
}

/// Partial update payload for `TaxonomyRegistry::update`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EntityTypeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub examples: Option<Vec<String>>,
    pub color: Option<String>,
    pub regex_pattern: Option<String>,
    pub use_llm: Option<bool>,
    pub enabled: Option<bool>,
    pub order: Option<i32>,
    pub tag_template: Option<String>,
}

/// The taxonomy registry itself: `id -> EntityTypeConfig`.
///
/// Not thread-safe by itself — the process-wide instance is wrapped by
/// `core::config::TaxonomyStore`, which adds the single-writer snapshot lock.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyRegistry {
    entries: BTreeMap<String, EntityTypeConfig>,
}

impl TaxonomyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry seeded with the built-in presets.
    ///
    /// Presets are registered from an ordered list of tables; a later table's
    /// entry with the same `id` overwrites an earlier one -- "newest-import-wins",
    /// per the Open Questions resolution in DESIGN.md.
    pub fn with_presets() -> Self {
        let mut registry = Self::new();
        for table in preset_tables() {
            for mut entry in table {
                entry.is_preset = true;
                registry.entries.insert(entry.id.clone(), entry);
            }
        }
        registry
    }

    pub fn get(&self, id: &str) -> Result<&EntityTypeConfig> {
        self.entries.get(id).ok_or_else(|| RedactorError::not_found(format!("entity type '{id}'")))
    }

    /// Ascending `order`, ties broken by `id`.
    pub fn list(&self, enabled_only: bool) -> Vec<&EntityTypeConfig> {
        let mut out: Vec<&EntityTypeConfig> =
            self.entries.values().filter(|e| !enabled_only || e.enabled).collect();
        out.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn create(
        &mut self,
        name: String,
        category: IdentifierCategory,
        description: Option<String>,
        examples: Vec<String>,
        color: String,
        regex_pattern: Option<String>,
        use_llm: bool,
        tag_template: Option<String>,
    ) -> Result<EntityTypeConfig> {
        let id = format!("custom_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let entry = EntityTypeConfig {
            id: id.clone(),
            name,
            category,
            description,
            examples,
            color,
            regex_pattern,
            use_llm,
            enabled: true,
            order: 200,
            tag_template,
            risk_level: 3,
            is_preset: false,
        };
        entry.validate()?;
        self.entries.insert(id, entry.clone());
        Ok(entry)
    }

    /// Preset entries may update everything except `id`.
    pub fn update(&mut self, id: &str, patch: EntityTypeUpdate) -> Result<EntityTypeConfig> {
        let entry = self.entries.get_mut(id).ok_or_else(|| RedactorError::not_found(format!("entity type '{id}'")))?;
        if let Some(v) = patch.name {
            entry.name = v;
        }
        if let Some(v) = patch.description {
            entry.description = Some(v);
        }
        if let Some(v) = patch.examples {
            entry.examples = v;
        }
        if let Some(v) = patch.color {
            entry.color = v;
        }
        if let Some(v) = patch.regex_pattern {
            entry.regex_pattern = Some(v);
        }
        if let Some(v) = patch.use_llm {
            entry.use_llm = v;
        }
        if let Some(v) = patch.enabled {
            entry.enabled = v;
        }
        if let Some(v) = patch.order {
            entry.order = v;
        }
        if let Some(v) = patch.tag_template {
            entry.tag_template = Some(v);
        }
        entry.validate()?;
        Ok(entry.clone())
    }

    /// User entries only; preset deletion fails with `PresetProtected`.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let entry = self.entries.get(id).ok_or_else(|| RedactorError::not_found(format!("entity type '{id}'")))?;
        if entry.is_preset {
            return Err(RedactorError::preset_protected(format!(
                "preset entity type '{id}' cannot be deleted, only disabled"
            )));
        }
        self.entries.remove(id);
        Ok(())
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let entry = self.entries.get_mut(id).ok_or_else(|| RedactorError::not_found(format!("entity type '{id}'")))?;
        entry.enabled = !entry.enabled;
        Ok(entry.enabled)
    }

    /// Restores presets verbatim, dropping user entries.
    pub fn reset(&mut self) {
        *self = Self::with_presets();
    }

    /// Overwrites (or inserts) an entry verbatim, used when rehydrating a
    /// persisted snapshot over the built-in presets.
    pub fn restore_entry(&mut self, entry: EntityTypeConfig) {
        self.entries.insert(entry.id.clone(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_presets_includes_id_card() {
        let registry = TaxonomyRegistry::with_presets();
        assert!(registry.get("ID_CARD").is_ok());
    }

    #[test]
    fn test_list_is_ordered_ascending_with_id_tiebreak() {
        let registry = TaxonomyRegistry::with_presets();
        let listed = registry.list(false);
        for pair in listed.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!((a.order, &a.id) <= (b.order, &b.id));
        }
    }

    #[test]
    fn test_create_assigns_custom_prefix_and_order_200() {
        let mut registry = TaxonomyRegistry::with_presets();
        let created = registry
            .create("Custom".into(), IdentifierCategory::Other, None, vec![], "#000000".into(), None, true, None)
            .unwrap();
        assert!(created.id.starts_with("custom_"));
        assert_eq!(created.order, 200);
        assert!(!created.is_preset);
    }

    #[test]
    fn test_delete_preset_fails_with_preset_protected() {
        let mut registry = TaxonomyRegistry::with_presets();
        let err = registry.delete("ID_CARD").unwrap_err();
        assert!(matches!(err, RedactorError::PresetProtected(_)));
    }

    #[test]
    fn test_delete_custom_entry_succeeds() {
        let mut registry = TaxonomyRegistry::with_presets();
        let created = registry
            .create("Custom".into(), IdentifierCategory::Other, None, vec![], "#000000".into(), None, true, None)
            .unwrap();
        assert!(registry.delete(&created.id).is_ok());
        assert!(registry.get(&created.id).is_err());
    }

    #[test]
    fn test_toggle_flips_enabled() {
        let mut registry = TaxonomyRegistry::with_presets();
        let before = registry.get("PHONE").unwrap().enabled;
        let after = registry.toggle("PHONE").unwrap();
        assert_eq!(after, !before);
    }

    #[test]
    fn test_reset_drops_user_entries() {
        let mut registry = TaxonomyRegistry::with_presets();
        let created = registry
            .create("Custom".into(), IdentifierCategory::Other, None, vec![], "#000000".into(), None, true, None)
            .unwrap();
        registry.reset();
        assert!(registry.get(&created.id).is_err());
        assert!(registry.get("ID_CARD").is_ok());
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let registry = TaxonomyRegistry::with_presets();
        assert!(matches!(registry.get("NOPE").unwrap_err(), RedactorError::NotFound(_)));
    }

    #[test]
    fn test_validate_rejects_missing_regex_without_llm() {
        let entry = EntityTypeConfig {
            id: "X".into(),
            name: "X".into(),
            category: IdentifierCategory::Other,
            description: None,
            examples: vec![],
            color: default_color(),
            regex_pattern: None,
            use_llm: false,
            enabled: true,
            order: 100,
            tag_template: None,
            risk_level: 3,
            is_preset: false,
        };
        assert!(entry.validate().is_err());
    }
}
