//! Replacement Engine: turns detected entities into deterministic
//! replacement strings, keyed by the document's CorefTable.
//!
//! Grounded on the source `redactor.py`'s `_generate_replacement`: per-type
//! counters, the Chinese-numeral sequence for `smart` mode, the
//! length-preserving masks for `mask` mode, and the tag-template resolution
//! order for `structured` mode.

use std::collections::HashMap;

use crate::taxonomy::TaxonomyRegistry;
use crate::types::{CorefTable, Entity, ReplacementMode};

const CHINESE_NUMERALS: [&str; 10] = ["一", "二", "三", "四", "五", "六", "七", "八", "九", "十"];

fn chinese_or_arabic(n: u64) -> String {
    if n >= 1 && (n as usize) <= CHINESE_NUMERALS.len() {
        CHINESE_NUMERALS[(n - 1) as usize].to_string()
    } else {
        n.to_string()
    }
}

fn smart_label(type_id: &str) -> &'static str {
    match type_id {
        "PERSON" => "当事人",
        "ORG" => "公司",
        "ADDRESS" => "地址",
        "PHONE" => "电话",
        "EMAIL" => "邮箱",
        "ID_CARD" => "身份证",
        "BANK_CARD" => "银行卡",
        "CASE_NUMBER" => "案号",
        "LAWYER" => "律师",
        "JUDGE" => "法官",
        "LEGAL_PARTY" => "当事人",
        "DATE" => "日期",
        "AMOUNT" => "金额",
        "LICENSE_PLATE" => "车牌",
        _ => "信息",
    }
}

fn structured_template(type_id: &str) -> &'static str {
    match type_id {
        "PERSON" | "LEGAL_PARTY" | "LAWYER" | "JUDGE" => "<人物[{index}].个人.姓名>",
        "ORG" => "<组织[{index}].机构.名称>",
        "ADDRESS" => "<地点[{index}].地址.详址>",
        "PHONE" => "<电话[{index}].联系方式.号码>",
        "EMAIL" => "<邮箱[{index}].联系方式.地址>",
        "DATE" => "<日期/时间[{index}].时间.日期>",
        "CASE_NUMBER" => "<编号[{index}].案件.案号>",
        _ => "<其他[{index}].信息.未分类>",
    }
}

fn mask_value(type_id: &str, text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    match type_id {
        "PERSON" if len >= 1 => {
            let mut out = String::new();
            out.push(chars[0]);
            out.push_str(&"*".repeat(len.saturating_sub(1)));
            out
        }
        "PHONE" if len >= 11 => {
            let head: String = chars[..3].iter().collect();
            let tail: String = chars[len - 4..].iter().collect();
            format!("{head}{}{tail}", "*".repeat(len - 7))
        }
        "ID_CARD" if len >= 10 => {
            let head: String = chars[..6].iter().collect();
            let tail: String = chars[len - 4..].iter().collect();
            format!("{head}{}{tail}", "*".repeat(len - 10))
        }
        "BANK_CARD" if len >= 4 => {
            let tail: String = chars[len - 4..].iter().collect();
            format!("{}{tail}", "*".repeat(len - 4))
        }
        _ => "*".repeat(len),
    }
}

/// `(original, replacement, type, count)` per distinct entity, in first-seen
/// order, for populating the `Reviewed` stage of the job state machine.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComparisonEntry {
    pub original: String,
    pub replacement: String,
    #[serde(rename = "type")]
    pub type_id: String,
    pub count: usize,
}

/// Per-document replacement state: the CorefTable plus per-type counters for
/// `smart` and `structured` mode.
#[derive(Debug, Default)]
pub struct ReplacementEngine {
    smart_counters: HashMap<String, u64>,
    structured_counters: HashMap<String, u64>,
}

impl ReplacementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves (and caches in `coref`) the replacement for `entity` under `mode`.
    pub fn replacement_for(
        &mut self,
        entity: &Entity,
        mode: ReplacementMode,
        registry: &TaxonomyRegistry,
        coref: &mut CorefTable,
        custom_map: Option<&HashMap<String, String>>,
    ) -> String {
        let coref_id = entity.coref_id.clone().unwrap_or_else(|| coref.coref_id_for(&entity.text, &entity.type_id));

        if let Some(existing) = coref.replacement_for(&coref_id) {
            return existing.to_string();
        }

        let replacement = match mode {
            ReplacementMode::Smart => {
                let counter = self.smart_counters.entry(entity.type_id.clone()).or_insert(0);
                *counter += 1;
                format!("[{}{}]", smart_label(&entity.type_id), chinese_or_arabic(*counter))
            }
            ReplacementMode::Mask => mask_value(&entity.type_id, &entity.text),
            ReplacementMode::Structured => {
                if coref_id.starts_with('<') {
                    coref_id.clone()
                } else {
                    let template = registry
                        .get(&entity.type_id)
                        .ok()
                        .and_then(|cfg| cfg.tag_template.clone())
                        .unwrap_or_else(|| structured_template(&entity.type_id).to_string());
                    let counter = self.structured_counters.entry(entity.type_id.clone()).or_insert(0);
                    *counter += 1;
                    template.replace("{index}", &format!("{:03}", counter))
                }
            }
            ReplacementMode::Custom => {
                custom_map.and_then(|m| m.get(&entity.text).cloned()).unwrap_or_else(|| {
                    let counter = self.smart_counters.entry(entity.type_id.clone()).or_insert(0);
                    *counter += 1;
                    format!("[{}{}]", smart_label(&entity.type_id), chinese_or_arabic(*counter))
                })
            }
        };

        coref.set_replacement(coref_id, replacement.clone());
        replacement
    }

    /// Resolves replacements for every entity and returns the final
    /// `entity_map: original_text -> replacement` used by writers, alongside a
    /// comparison/diff summary for the review stage.
    pub fn resolve_all(
        &mut self,
        entities: &[Entity],
        mode: ReplacementMode,
        registry: &TaxonomyRegistry,
        coref: &mut CorefTable,
        custom_map: Option<&HashMap<String, String>>,
    ) -> (HashMap<String, String>, Vec<ComparisonEntry>) {
        let mut entity_map = HashMap::new();
        let mut counts: HashMap<(String, String), usize> = HashMap::new();
        let mut order: Vec<(String, String)> = Vec::new();

        for entity in entities {
            let replacement = self.replacement_for(entity, mode, registry, coref, custom_map);
            entity_map.insert(entity.text.clone(), replacement.clone());

            let key = (entity.text.clone(), replacement.clone());
            if !counts.contains_key(&key) {
                order.push(key.clone());
            }
            *counts.entry(key).or_insert(0) += 1;
        }

        let comparison = order
            .into_iter()
            .map(|(original, replacement)| {
                let type_id = entities.iter().find(|e| e.text == original).map(|e| e.type_id.clone()).unwrap_or_default();
                let count = counts[&(original.clone(), replacement.clone())];
                ComparisonEntry { original, replacement, type_id, count }
            })
            .collect();

        (entity_map, comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntitySource;

    #[test]
    fn test_smart_mode_counts_up_in_chinese_numerals() {
        let registry = TaxonomyRegistry::with_presets();
        let mut coref = CorefTable::new();
        let mut engine = ReplacementEngine::new();
        let e1 = Entity::new("张三", "PERSON", 0, 2, 0.9, EntitySource::Ner);
        let e2 = Entity::new("李四", "PERSON", 10, 12, 0.9, EntitySource::Ner);
        let r1 = engine.replacement_for(&e1, ReplacementMode::Smart, &registry, &mut coref, None);
        let r2 = engine.replacement_for(&e2, ReplacementMode::Smart, &registry, &mut coref, None);
        assert_eq!(r1, "[当事人一]");
        assert_eq!(r2, "[当事人二]");
    }

    #[test]
    fn test_smart_mode_stable_for_same_coref_id() {
        let registry = TaxonomyRegistry::with_presets();
        let mut coref = CorefTable::new();
        let mut engine = ReplacementEngine::new();
        let mut e1 = Entity::new("张三", "PERSON", 0, 2, 0.9, EntitySource::Ner);
        e1.coref_id = Some(coref.coref_id_for("张三", "PERSON"));
        let mut e2 = Entity::new("张三", "PERSON", 20, 22, 0.9, EntitySource::Ner);
        e2.coref_id = Some(coref.coref_id_for("张三", "PERSON"));
        let r1 = engine.replacement_for(&e1, ReplacementMode::Smart, &registry, &mut coref, None);
        let r2 = engine.replacement_for(&e2, ReplacementMode::Smart, &registry, &mut coref, None);
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_mask_mode_phone_keeps_head_and_tail() {
        assert_eq!(mask_value("PHONE", "13812345678"), "138****5678");
    }

    #[test]
    fn test_mask_mode_person_keeps_first_char() {
        assert_eq!(mask_value("PERSON", "张三丰"), "张**");
    }

    #[test]
    fn test_structured_mode_uses_tag_template_with_zero_padded_index() {
        let registry = TaxonomyRegistry::with_presets();
        let mut coref = CorefTable::new();
        let mut engine = ReplacementEngine::new();
        let e = Entity::new("张三", "PERSON", 0, 2, 0.9, EntitySource::Ner);
        let r = engine.replacement_for(&e, ReplacementMode::Structured, &registry, &mut coref, None);
        assert_eq!(r, "<人物[001].个人.姓名>");
    }

    #[test]
    fn test_structured_mode_reuses_hide_tag_verbatim() {
        let registry = TaxonomyRegistry::with_presets();
        let mut coref = CorefTable::new();
        let mut engine = ReplacementEngine::new();
        let mut e = Entity::new("李雷", "PERSON", 0, 2, 0.9, EntitySource::Ner);
        e.coref_id = Some("<人物[007].个人.姓名>".to_string());
        coref.bind("李雷", "PERSON", "<人物[007].个人.姓名>");
        let r = engine.replacement_for(&e, ReplacementMode::Structured, &registry, &mut coref, None);
        assert_eq!(r, "<人物[007].个人.姓名>");
    }

    #[test]
    fn test_custom_mode_falls_back_to_smart_when_unmapped() {
        let registry = TaxonomyRegistry::with_presets();
        let mut coref = CorefTable::new();
        let mut engine = ReplacementEngine::new();
        let e = Entity::new("张三", "PERSON", 0, 2, 0.9, EntitySource::Ner);
        let r = engine.replacement_for(&e, ReplacementMode::Custom, &registry, &mut coref, None);
        assert_eq!(r, "[当事人一]");
    }

    #[test]
    fn test_resolve_all_builds_comparison_summary() {
        let registry = TaxonomyRegistry::with_presets();
        let mut coref = CorefTable::new();
        let mut engine = ReplacementEngine::new();
        let entities = vec![
            Entity::new("张三", "PERSON", 0, 2, 0.9, EntitySource::Ner),
            Entity::new("张三", "PERSON", 10, 12, 0.9, EntitySource::Ner),
        ];
        let (map, comparison) = engine.resolve_all(&entities, ReplacementMode::Smart, &registry, &mut coref, None);
        assert_eq!(map.get("张三"), Some(&"[当事人一]".to_string()));
        assert_eq!(comparison.len(), 1);
        assert_eq!(comparison[0].count, 2);
    }
}
