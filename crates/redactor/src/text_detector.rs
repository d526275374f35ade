//! Three-stage hybrid text detector: neural NER, regex, cross-validate + coref.
//!
//! Grounded on the source `hybrid_ner_service.py`: the exact `source_rank`/
//! `type_priority` tie-break tables and the four-step `_cross_validate`
//! algorithm (position fix-up, per-position dedup, overlap resolution,
//! coreference linking).

use std::collections::HashMap;

use crate::error::RedactorWarning;
use crate::ner::TextNerClient;
use crate::regex_matcher;
use crate::span::ByteToChar;
use crate::taxonomy::TaxonomyRegistry;
use crate::types::{CorefTable, Entity, EntitySource};

/// Which neural stage(s) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerMode {
    /// Flat entity list via `ner`.
    Ner,
    /// Structured tags via `hide`; the tag becomes the `coref_id`.
    Hide,
    /// Run both and union the candidates.
    Auto,
}

/// Output of a full hybrid-detection pass over one document.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub entities: Vec<Entity>,
    pub warnings: Vec<RedactorWarning>,
}

/// Chinese structured-tag category prefix -> type id, used to recover a type
/// for entities whose identity came from `hide`'s tag rather than from `ner`.
fn type_from_tag_category(tag: &str) -> Option<&'static str> {
    let category = tag.trim_start_matches('<').split(['[', '.']).next()?;
    Some(match category {
        "人物" => "PERSON",
        "组织" => "ORG",
        "地点" => "ADDRESS",
        "电话" => "PHONE",
        "邮箱" => "EMAIL",
        "金额" => "AMOUNT",
        "日期/时间" => "DATE",
        "编号" => "CASE_NUMBER",
        _ => return None,
    })
}

fn type_priority(type_id: &str) -> u8 {
    match type_id {
        "ADDRESS" => 3,
        "ORG" | "PERSON" | "LEGAL_PARTY" | "LAWYER" | "JUDGE" => 2,
        _ => 1,
    }
}

/// Finds every non-overlapping occurrence of `needle` in `haystack`,
/// discarding the mention entirely if it cannot be located (the model may
/// have paraphrased it).
fn locate_all(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }
    haystack.match_indices(needle).map(|(start, matched)| (start, start + matched.len())).collect()
}

async fn run_ner_stage(
    client: &TextNerClient,
    document: &str,
    byte_to_char: &ByteToChar,
    types: &[String],
    mode: NerMode,
    warnings: &mut Vec<RedactorWarning>,
) -> Vec<Entity> {
    let mut out = Vec::new();

    if matches!(mode, NerMode::Ner | NerMode::Auto) {
        match client.ner(document, types).await {
            Ok(map) => out.extend(entities_from_ner_map(document, byte_to_char, &map)),
            Err(err) => warnings.push(RedactorWarning::from_error("ner", &err)),
        }
    }

    if matches!(mode, NerMode::Hide | NerMode::Auto) {
        match client.hide(document, types, true).await {
            Ok((_masked, mapping)) => out.extend(entities_from_hide_mapping(document, byte_to_char, &mapping)),
            Err(err) => warnings.push(RedactorWarning::from_error("hide", &err)),
        }
    }

    out
}

fn entities_from_ner_map(document: &str, byte_to_char: &ByteToChar, map: &HashMap<String, Vec<String>>) -> Vec<Entity> {
    let mut out = Vec::new();
    for (type_id, mentions) in map {
        for mention in mentions {
            for (start, end) in locate_all(document, mention) {
                let (start, end) = byte_to_char.char_span(start, end);
                let mut entity = Entity::new(mention.clone(), type_id.clone(), start, end, 0.95, EntitySource::Ner);
                entity.id = format!("ner_{type_id}_{start}_{end}");
                out.push(entity);
            }
        }
    }
    out
}

fn entities_from_hide_mapping(
    document: &str,
    byte_to_char: &ByteToChar,
    mapping: &HashMap<String, Vec<String>>,
) -> Vec<Entity> {
    let mut out = Vec::new();
    for (tag, originals) in mapping {
        let type_id = type_from_tag_category(tag).unwrap_or("CUSTOM").to_string();
        for original in originals {
            for (start, end) in locate_all(document, original) {
                let (start, end) = byte_to_char.char_span(start, end);
                let mut entity =
                    Entity::new(original.clone(), type_id.clone(), start, end, 0.95, EntitySource::Ner);
                entity.id = format!("hide_{start}_{end}");
                entity.coref_id = Some(tag.clone());
                out.push(entity);
            }
        }
    }
    out
}

/// Stage 3: cross-validate and coreference-link the union of NER and regex
/// candidates.
fn cross_validate(document: &str, mut candidates: Vec<Entity>, coref: &mut CorefTable) -> Vec<Entity> {
    // 1. Position fix-up: drop anything whose span no longer matches its text
    // (defensive; construction already guarantees this for our candidate sources).
    // `start`/`end` are character offsets, so the document is indexed by char here.
    let chars: Vec<char> = document.chars().collect();
    candidates.retain(|e| chars.get(e.start..e.end).map(|s| s.iter().collect::<String>() == e.text).unwrap_or(false));

    // 2. Per-position deduplication.
    let mut by_position: HashMap<(usize, usize), Vec<Entity>> = HashMap::new();
    for entity in candidates {
        by_position.entry((entity.start, entity.end)).or_default().push(entity);
    }

    let mut deduped: Vec<Entity> = by_position
        .into_values()
        .map(|mut group| {
            group.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.source.rank().cmp(&a.source.rank()))
                    .then_with(|| type_priority(&b.type_id).cmp(&type_priority(&a.type_id)))
                    .then_with(|| a.type_id.cmp(&b.type_id))
            });
            group.into_iter().next().expect("group is non-empty by construction")
        })
        .collect();

    // 3. Overlap resolution: start ascending, longest-first greedy accept.
    deduped.sort_by(|a, b| a.start.cmp(&b.start).then(b.len().cmp(&a.len())));
    let mut accepted = Vec::with_capacity(deduped.len());
    let mut last_end = 0usize;
    for entity in deduped {
        if entity.start >= last_end {
            last_end = entity.end;
            accepted.push(entity);
        }
    }

    // 4. Coreference: equivalence class (canonical_text, type), overridden by
    // a pre-existing coref_id from hide mode.
    for entity in &mut accepted {
        match entity.coref_id.take() {
            Some(tag) => {
                coref.bind(&entity.text, &entity.type_id, tag.clone());
                entity.coref_id = Some(tag);
            }
            None => {
                entity.coref_id = Some(coref.coref_id_for(&entity.text, &entity.type_id));
            }
        }
    }

    // 5. Id rewrite in start order (already sorted by start from step 3).
    for (idx, entity) in accepted.iter_mut().enumerate() {
        entity.id = format!("entity_{idx}");
    }

    accepted
}

/// Runs the full three-stage pipeline over `document`.
///
/// Empty text returns an empty result without error. If the NER transport
/// fails, regex-only detection still proceeds; the failure is recorded as a
/// warning rather than propagated.
pub async fn detect(
    document: &str,
    registry: &TaxonomyRegistry,
    enabled_type_ids: &[String],
    ner_client: &TextNerClient,
    mode: NerMode,
    coref: &mut CorefTable,
) -> DetectionResult {
    if document.is_empty() {
        return DetectionResult { entities: Vec::new(), warnings: Vec::new() };
    }

    let mut warnings = Vec::new();

    let byte_to_char = ByteToChar::new(document);
    let ner_entities =
        run_ner_stage(ner_client, document, &byte_to_char, enabled_type_ids, mode, &mut warnings).await;
    let regex_entities = regex_matcher::extract(document, registry, enabled_type_ids);

    let mut candidates = ner_entities;
    candidates.extend(regex_entities);

    let entities = cross_validate(document, candidates, coref);

    DetectionResult { entities, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_all_finds_non_overlapping_occurrences() {
        let positions = locate_all("张三向张三的朋友李四转账。", "张三");
        assert_eq!(positions, vec![(0, 6), (9, 15)]);
    }

    #[test]
    fn test_locate_all_discards_unlocatable_mention() {
        assert!(locate_all("no such name here", "张三").is_empty());
    }

    #[test]
    fn test_type_from_tag_category_recognizes_person() {
        assert_eq!(type_from_tag_category("<人物[001].个人.姓名>"), Some("PERSON"));
    }

    #[test]
    fn test_cross_validate_seed_scenario_c_long_beats_short() {
        let doc = "张三丰是武当派宗师。";
        let mut candidates = Vec::new();
        for (text, start, end) in [("张三丰", 0, 3), ("张三", 0, 2), ("武当派", 4, 7)] {
            let mut e = Entity::new(text, "PERSON", start, end, 0.9, EntitySource::Ner);
            e.id = format!("c_{start}");
            candidates.push(e);
        }
        let mut coref = CorefTable::new();
        let accepted = cross_validate(doc, candidates, &mut coref);
        let texts: Vec<&str> = accepted.iter().map(|e| e.text.as_str()).collect();
        assert!(texts.contains(&"张三丰"));
        assert!(!texts.contains(&"张三"));
    }

    #[test]
    fn test_cross_validate_assigns_shared_coref_for_repeated_text() {
        let doc = "张三向张三的朋友李四转账。";
        let mut candidates = Vec::new();
        for (text, start, end) in [("张三", 0, 2), ("张三", 3, 5), ("李四", 8, 10)] {
            let mut e = Entity::new(text, "PERSON", start, end, 0.9, EntitySource::Ner);
            e.id = format!("c_{start}");
            candidates.push(e);
        }
        let mut coref = CorefTable::new();
        let accepted = cross_validate(doc, candidates, &mut coref);
        assert_eq!(accepted[0].coref_id, accepted[1].coref_id);
        assert_ne!(accepted[0].coref_id, accepted[2].coref_id);
    }

    #[test]
    fn test_cross_validate_prefers_regex_on_tied_position() {
        let doc = "call 13812345678 now";
        let start = doc.find("13812345678").unwrap();
        let end = start + "13812345678".len();
        let mut ner_entity = Entity::new("13812345678", "PHONE", start, end, 0.95, EntitySource::Ner);
        ner_entity.id = "n".into();
        let mut regex_entity = Entity::new("13812345678", "PHONE", start, end, 0.99, EntitySource::Regex);
        regex_entity.id = "r".into();
        let mut coref = CorefTable::new();
        let accepted = cross_validate(doc, vec![ner_entity, regex_entity], &mut coref);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].source, EntitySource::Regex);
        assert_eq!(accepted[0].confidence, 0.99);
    }

    #[test]
    fn test_ids_rewritten_in_start_order() {
        let doc = "AB CD";
        let mut e1 = Entity::new("CD", "PERSON", 3, 5, 0.9, EntitySource::Ner);
        e1.id = "zzz".into();
        let mut e2 = Entity::new("AB", "PERSON", 0, 2, 0.9, EntitySource::Ner);
        e2.id = "aaa".into();
        let mut coref = CorefTable::new();
        let accepted = cross_validate(doc, vec![e1, e2], &mut coref);
        assert_eq!(accepted[0].id, "entity_0");
        assert_eq!(accepted[0].text, "AB");
        assert_eq!(accepted[1].id, "entity_1");
    }
}
