//! OCR+NER sub-pipeline: OCR text blocks enriched by entity recognition and a
//! small regex overlay, each mention reprojected onto sub-pixel geometry.
//!
//! Grounded on the source `hybrid_vision_service._run_ocr_ner_pipeline`: seal
//! promotion, table expansion, concatenated-text NER, substring reprojection
//! with the whole-block-vs-interpolation split, and the Levenshtein fallback.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RedactorWarning;
use crate::ner::TextNerClient;
use crate::ocr::{OcrClient, expand_table_block};
use crate::taxonomy::TaxonomyRegistry;
use crate::types::{BoundingBox, BoundingBoxSource, OCRTextBlock};

const MIN_SUB_WIDTH_PX: f32 = 20.0;
const SHORT_BLOCK_CHARS: usize = 100;
const WHOLE_BLOCK_OCCUPANCY: f32 = 0.8;
const SIMILARITY_THRESHOLD: f32 = 0.85;
const MERGE_IOU: f32 = 0.5;

/// Chinese entity-category labels the NER model was trained on, keyed by our
/// stable type id. Reverse lookup accepts the same set of synonyms used by
/// the hide-mode tag parser in the text detector.
const TYPE_TO_CHINESE: &[(&str, &str)] = &[
    ("PERSON", "人物"),
    ("ORG", "组织"),
    ("ADDRESS", "地点"),
    ("PHONE", "电话"),
    ("EMAIL", "邮箱"),
    ("AMOUNT", "金额"),
    ("DATE", "日期/时间"),
    ("CASE_NUMBER", "编号"),
];

fn chinese_label_for(type_id: &str) -> Option<&'static str> {
    TYPE_TO_CHINESE.iter().find(|(id, _)| *id == type_id).map(|(_, label)| *label)
}

fn type_id_for_chinese(label: &str) -> Option<&'static str> {
    let category = label.split(['[', '.']).next().unwrap_or(label);
    TYPE_TO_CHINESE.iter().find(|(_, l)| *l == category).map(|(id, _)| *id)
}

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b1[3-9]\d{9}\b").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap());
static ID_CARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[1-9]\d{5}\d{2}(?:0[1-9]|1[0-2])(?:0[1-9]|[12]\d|3[01])\d{3}[\dXx]\b").unwrap());
static BANK_CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{16,19}\b").unwrap());
static DATED_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}[-./年]\d{1,2}[-./月]\d{1,2}日?\b").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").unwrap());
static COMPANY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{Han}A-Za-z0-9]{2,30}(?:有限公司|股份有限公司|集团|公司)").unwrap());

fn regex_overlay() -> [(&'static Regex, &'static str); 7] {
    [
        (&PHONE_RE, "PHONE"),
        (&EMAIL_RE, "EMAIL"),
        (&ID_CARD_RE, "ID_CARD"),
        (&BANK_CARD_RE, "BANK_CARD"),
        (&DATED_NUMBER_RE, "DATE"),
        (&URL_RE, "URL"),
        (&COMPANY_RE, "ORG"),
    ]
}

fn is_multi_field_line(text: &str) -> bool {
    let separator_count = text.chars().filter(|c| matches!(c, ':' | '：' | '|')).count();
    separator_count >= 2 || text.contains("  ") || text.contains('\t')
}

/// Computes sub-pixel geometry for `mention` found at char index `pos` inside
/// `block`, applying the whole-block-vs-interpolation rule.
fn reproject(block: &OCRTextBlock, pos: usize, mention_len_chars: usize) -> (f32, f32, f32, f32) {
    let (left, top, width, height) = block.rect();
    let total_chars = block.text.chars().count().max(1);
    let occupancy = mention_len_chars as f32 / total_chars as f32;

    let whole_block =
        total_chars <= SHORT_BLOCK_CHARS || occupancy > WHOLE_BLOCK_OCCUPANCY || is_multi_field_line(&block.text);

    if whole_block {
        return (left, top, width, height);
    }

    let sub_left = left + (pos as f32 / total_chars as f32) * width;
    let sub_width = ((mention_len_chars as f32 / total_chars as f32) * width).max(MIN_SUB_WIDTH_PX);
    (sub_left, top, sub_width, height)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (la, lb) = (a.len(), b.len());
    let mut prev: Vec<usize> = (0..=lb).collect();
    let mut curr = vec![0usize; lb + 1];
    for i in 1..=la {
        curr[0] = i;
        for j in 1..=lb {
            curr[j] = if a[i - 1] == b[j - 1] {
                prev[j - 1]
            } else {
                1 + prev[j - 1].min(prev[j]).min(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[lb]
}

fn similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count()).max(1);
    1.0 - levenshtein(a, b) as f32 / max_len as f32
}

struct Candidate {
    bbox: BoundingBox,
}

fn find_block_and_reproject(
    blocks: &[OCRTextBlock],
    mention: &str,
    type_id: &str,
    confidence: f32,
    width: f32,
    height: f32,
) -> Option<BoundingBox> {
    let mention_chars = mention.chars().count();

    let mut ordered: Vec<&OCRTextBlock> = blocks.iter().collect();
    ordered.sort_by_key(|b| b.text.chars().count());

    for block in &ordered {
        if let Some(byte_pos) = block.text.find(mention) {
            let char_pos = block.text[..byte_pos].chars().count();
            let (x, y, w, h) = reproject(block, char_pos, mention_chars);
            let mut bbox =
                BoundingBox::new(type_id, x / width, y / height, w / width, h / height, BoundingBoxSource::OcrHas, confidence);
            bbox.text = Some(mention.to_string());
            return Some(bbox);
        }
    }

    for block in &ordered {
        if similarity(mention, &block.text) >= SIMILARITY_THRESHOLD {
            let (left, top, w, h) = block.rect();
            let mut bbox = BoundingBox::new(
                type_id,
                left / width,
                top / height,
                w / width,
                h / height,
                BoundingBoxSource::OcrHas,
                confidence * 0.9,
            );
            bbox.text = Some(mention.to_string());
            return Some(bbox);
        }
    }

    None
}

fn merge_by_iou(candidates: Vec<Candidate>) -> Vec<BoundingBox> {
    let mut accepted: Vec<BoundingBox> = Vec::new();
    'outer: for candidate in candidates {
        for existing in &accepted {
            if existing.iou(&candidate.bbox) >= MERGE_IOU {
                continue 'outer;
            }
        }
        accepted.push(candidate.bbox);
    }
    accepted
}

/// Runs the full sub-pipeline over one image, returning unit-coordinate boxes
/// already in pixel-then-normalized form (blocks are pre-divided by the
/// caller's image dimensions before being passed in as `blocks_unit`).
pub async fn run(
    ocr: &OcrClient,
    ner_client: &TextNerClient,
    image_bytes: &[u8],
    width: f32,
    height: f32,
    registry: &TaxonomyRegistry,
    enabled_type_ids: &[String],
) -> (Vec<BoundingBox>, Vec<RedactorWarning>) {
    let mut warnings = Vec::new();

    if enabled_type_ids.is_empty() {
        return (Vec::new(), warnings);
    }

    let raw_blocks = match ocr.extract_text_blocks(image_bytes, width, height).await {
        Ok(blocks) => blocks,
        Err(err) => {
            warnings.push(RedactorWarning::from_error("ocr", &err));
            return (Vec::new(), warnings);
        }
    };

    let mut seal_boxes = Vec::new();
    let mut text_blocks = Vec::new();
    for block in raw_blocks {
        if block.is_seal() {
            let (x, y, w, h) = block.rect();
            let mut bbox = BoundingBox::new(
                "SEAL",
                x / width,
                y / height,
                w / width,
                h / height,
                BoundingBoxSource::OcrHas,
                block.confidence,
            );
            bbox.text = Some(block.text.clone());
            seal_boxes.push(bbox);
            continue;
        }
        if block.is_table() {
            text_blocks.extend(expand_table_block(&block));
        } else {
            text_blocks.push(block);
        }
    }

    let enabled_chinese: Vec<String> =
        enabled_type_ids.iter().filter_map(|id| chinese_label_for(id)).map(str::to_string).collect();

    let mut candidates: Vec<Candidate> = seal_boxes.into_iter().map(|bbox| Candidate { bbox }).collect();

    if !enabled_chinese.is_empty() && !text_blocks.is_empty() {
        let concatenated = text_blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n");
        match ner_client.ner(&concatenated, &enabled_chinese).await {
            Ok(map) => {
                for (label, mentions) in map {
                    let Some(type_id) = type_id_for_chinese(&label) else { continue };
                    if !enabled_type_ids.iter().any(|t| t == type_id) {
                        continue;
                    }
                    for mention in mentions {
                        if let Some(bbox) = find_block_and_reproject(&text_blocks, &mention, type_id, 0.9, width, height) {
                            candidates.push(Candidate { bbox });
                        }
                    }
                }
            }
            Err(err) => warnings.push(RedactorWarning::from_error("vision_ner", &err)),
        }
    }

    for (re, type_id) in regex_overlay() {
        if !enabled_type_ids.iter().any(|t| t == type_id) {
            continue;
        }
        for block in &text_blocks {
            for m in re.find_iter(&block.text) {
                let char_pos = block.text[..m.start()].chars().count();
                let (x, y, w, h) = reproject(block, char_pos, m.as_str().chars().count());
                let mut bbox = BoundingBox::new(type_id, x / width, y / height, w / width, h / height, BoundingBoxSource::OcrHas, 0.95);
                bbox.text = Some(m.as_str().to_string());
                candidates.push(Candidate { bbox });
            }
        }
    }

    (merge_by_iou(candidates), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, x: f32, y: f32, w: f32, h: f32) -> OCRTextBlock {
        OCRTextBlock { text: text.to_string(), quad: [(x, y), (x + w, y), (x + w, y + h), (x, y + h)], confidence: 0.9, label: "text".into() }
    }

    #[test]
    fn test_short_block_uses_whole_rect() {
        let b = block("张三", 0.0, 0.0, 100.0, 20.0);
        let (x, y, w, h) = reproject(&b, 0, 2);
        assert_eq!((x, y, w, h), (0.0, 0.0, 100.0, 20.0));
    }

    #[test]
    fn test_long_line_interpolates() {
        let long_text = "a".repeat(150);
        let b = block(&long_text, 0.0, 0.0, 1500.0, 20.0);
        let (x, _, w, _) = reproject(&b, 50, 10);
        assert!((x - 500.0).abs() < 1.0);
        assert!((w - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_multi_field_line_uses_whole_rect() {
        let long_text = format!("姓名：{}  电话：{}", "a".repeat(60), "1".repeat(60));
        let b = block(&long_text, 0.0, 0.0, 1000.0, 20.0);
        let (_, _, w, _) = reproject(&b, 3, 5);
        assert_eq!(w, 1000.0);
    }

    #[test]
    fn test_levenshtein_similarity_identical_is_one() {
        assert_eq!(similarity("abc", "abc"), 1.0);
    }

    #[test]
    fn test_merge_by_iou_drops_overlapping_second_candidate() {
        let b1 = BoundingBox::new("PERSON", 0.1, 0.1, 0.2, 0.2, BoundingBoxSource::OcrHas, 0.9);
        let b2 = BoundingBox::new("PERSON", 0.11, 0.11, 0.2, 0.2, BoundingBoxSource::OcrHas, 0.9);
        let merged = merge_by_iou(vec![Candidate { bbox: b1 }, Candidate { bbox: b2 }]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_regex_overlay_finds_phone_in_block() {
        let re = &PHONE_RE;
        assert!(re.is_match("13812345678"));
    }
}
