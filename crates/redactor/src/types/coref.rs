use std::collections::HashMap;

/// Per-document coreference bookkeeping.
///
/// Maps `(canonical_text, type_id) -> coref_id` and `coref_id -> replacement`.
/// One table per document; cleared when a new document starts.
#[derive(Debug, Default, Clone)]
pub struct CorefTable {
    equivalence: HashMap<(String, String), String>,
    replacements: HashMap<String, String>,
    next_seq: u64,
}

impl CorefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing coref id for `(text, type_id)`, or mints a fresh one.
    pub fn coref_id_for(&mut self, text: &str, type_id: &str) -> String {
        let key = (text.to_string(), type_id.to_string());
        if let Some(id) = self.equivalence.get(&key) {
            return id.clone();
        }
        let id = format!("coref_{}", self.next_seq);
        self.next_seq += 1;
        self.equivalence.insert(key, id.clone());
        id
    }

    /// Forces `(text, type_id)` onto an externally supplied coref id, used when
    /// `hide` mode's structured tag overrides the generated equivalence class.
    pub fn bind(&mut self, text: &str, type_id: &str, coref_id: impl Into<String>) {
        self.equivalence.insert((text.to_string(), type_id.to_string()), coref_id.into());
    }

    pub fn replacement_for(&self, coref_id: &str) -> Option<&str> {
        self.replacements.get(coref_id).map(String::as_str)
    }

    pub fn set_replacement(&mut self, coref_id: impl Into<String>, replacement: impl Into<String>) {
        self.replacements.insert(coref_id.into(), replacement.into());
    }

    pub fn clear(&mut self) {
        self.equivalence.clear();
        self.replacements.clear();
        self.next_seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_and_type_share_coref_id() {
        let mut table = CorefTable::new();
        let a = table.coref_id_for("张三", "PERSON");
        let b = table.coref_id_for("张三", "PERSON");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_type_gets_distinct_coref_id() {
        let mut table = CorefTable::new();
        let a = table.coref_id_for("张三", "PERSON");
        let b = table.coref_id_for("张三", "ORG");
        assert_ne!(a, b);
    }

    #[test]
    fn test_bind_overrides_equivalence_class() {
        let mut table = CorefTable::new();
        table.bind("李雷", "PERSON", "<人物[001].个人.姓名>");
        assert_eq!(table.coref_id_for("李雷", "PERSON"), "<人物[001].个人.姓名>");
    }

    #[test]
    fn test_replacement_round_trips() {
        let mut table = CorefTable::new();
        let id = table.coref_id_for("张三", "PERSON");
        table.set_replacement(id.clone(), "[当事人一]");
        assert_eq!(table.replacement_for(&id), Some("[当事人一]"));
    }
}
