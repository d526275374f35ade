//! Coordinate-convention auto-detection for direct-mode VLM responses.
//!
//! Grounded on the source `glm_client._normalize_box`/`score_mode`: score four
//! candidate conventions by how many raw boxes land plausibly in unit space,
//! then apply the winner, clamp, and discard junk.

use crate::types::BoundingBox;

/// A raw, un-normalized detection box as returned by the model, `[x1,y1,x2,y2]`.
#[derive(Debug, Clone, Copy)]
pub struct RawBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Convention {
    Pixel,
    Normalized,
    Square(u32),
    SquareLetterbox(u32),
}

/// Plausibility bounds used while *scoring* candidate conventions.
const SCORE_MIN_SIDE: f32 = 0.003;
const SCORE_MAX_SIDE: f32 = 0.98;

/// Stricter bounds used to discard junk boxes *after* a convention is chosen.
const JUNK_MIN_SIDE: f32 = 0.005;
const JUNK_MAX_SIDE: f32 = 0.95;

fn apply(conv: Convention, raw: RawBox, width: f32, height: f32) -> (f32, f32, f32, f32) {
    match conv {
        Convention::Pixel => (raw.x1 / width, raw.y1 / height, raw.x2 / width, raw.y2 / height),
        Convention::Normalized => (raw.x1, raw.y1, raw.x2, raw.y2),
        Convention::Square(base) => {
            let b = base as f32;
            (raw.x1 / b, raw.y1 / b, raw.x2 / b, raw.y2 / b)
        }
        Convention::SquareLetterbox(base) => {
            let b = base as f32;
            let scale = (b / width).min(b / height);
            let pad_x = (b - width * scale) / 2.0;
            let pad_y = (b - height * scale) / 2.0;
            (
                (raw.x1 - pad_x) / scale / width,
                (raw.y1 - pad_y) / scale / height,
                (raw.x2 - pad_x) / scale / width,
                (raw.y2 - pad_y) / scale / height,
            )
        }
    }
}

fn is_plausible(x1: f32, y1: f32, x2: f32, y2: f32, min_side: f32, max_side: f32) -> bool {
    let w = x2 - x1;
    let h = y2 - y1;
    x1 >= 0.0 && y1 >= 0.0 && x2 <= 1.0 && y2 <= 1.0 && w > min_side && w < max_side && h > min_side && h < max_side
}

/// Higher score wins; `coord_square` variants beat `pixel`/`normalized` on ties.
fn tie_break_rank(conv: Convention) -> u8 {
    match conv {
        Convention::Square(_) | Convention::SquareLetterbox(_) => 1,
        Convention::Pixel | Convention::Normalized => 0,
    }
}

/// Detects the coordinate convention used by `raw_boxes` and returns unit-space
/// `BoundingBox` values, discarding junk boxes whose normalized width/height
/// falls outside `[0.005, 0.95]`. The caption text travels alongside each raw
/// box so it stays attached to the right box even where junk-filtering drops
/// or reorders entries.
pub fn normalize_boxes(raw_boxes: &[(String, Option<String>, RawBox)], width: f32, height: f32) -> Vec<BoundingBox> {
    if raw_boxes.is_empty() || width <= 0.0 || height <= 0.0 {
        return Vec::new();
    }

    let candidates = [
        Convention::Pixel,
        Convention::Normalized,
        Convention::Square(1000),
        Convention::Square(1024),
        Convention::SquareLetterbox(1000),
        Convention::SquareLetterbox(1024),
    ];

    let mut best = candidates[0];
    let mut best_score = -1i32;
    for &conv in &candidates {
        let score = raw_boxes
            .iter()
            .filter(|(_, _, raw)| {
                let (x1, y1, x2, y2) = apply(conv, *raw, width, height);
                is_plausible(x1, y1, x2, y2, SCORE_MIN_SIDE, SCORE_MAX_SIDE)
            })
            .count() as i32;

        if score > best_score || (score == best_score && tie_break_rank(conv) > tie_break_rank(best)) {
            best_score = score;
            best = conv;
        }
    }

    raw_boxes
        .iter()
        .filter_map(|(type_id, text, raw)| {
            let (mut x1, mut y1, mut x2, mut y2) = apply(best, *raw, width, height);
            x1 = x1.clamp(0.0, 1.0);
            y1 = y1.clamp(0.0, 1.0);
            x2 = x2.clamp(0.0, 1.0);
            y2 = y2.clamp(0.0, 1.0);
            if x1 >= x2 || y1 >= y2 {
                return None;
            }
            let w = x2 - x1;
            let h = y2 - y1;
            if w < JUNK_MIN_SIDE || w > JUNK_MAX_SIDE || h < JUNK_MIN_SIDE || h > JUNK_MAX_SIDE {
                return None;
            }
            let mut bbox = BoundingBox::new(type_id.clone(), x1, y1, w, h, crate::types::BoundingBoxSource::GlmVision, 0.9);
            bbox.text = text.clone();
            Some(bbox)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_scenario_f_coord_square_auto_detection() {
        let raw = vec![
            ("SEAL".to_string(), None, RawBox { x1: 50.0, y1: 50.0, x2: 450.0, y2: 250.0 }),
            ("PERSON".to_string(), None, RawBox { x1: 100.0, y1: 100.0, x2: 300.0, y2: 200.0 }),
        ];
        let boxes = normalize_boxes(&raw, 2000.0, 1500.0);
        assert_eq!(boxes.len(), 2);
        let seal = &boxes[0];
        assert!((seal.x - 0.05).abs() < 1e-4);
        assert!((seal.y - 0.05).abs() < 1e-4);
        assert!((seal.width - 0.40).abs() < 1e-4);
        assert!((seal.height - 0.20).abs() < 1e-4);
    }

    #[test]
    fn test_empty_input_returns_empty() {
        assert!(normalize_boxes(&[], 100.0, 100.0).is_empty());
    }

    #[test]
    fn test_junk_box_discarded_after_normalization() {
        let raw = vec![("X".to_string(), None, RawBox { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 })];
        let boxes = normalize_boxes(&raw, 1000.0, 1000.0);
        assert!(boxes.is_empty(), "a box spanning the whole page should be treated as junk");
    }

    #[test]
    fn test_already_normalized_boxes_pass_through() {
        let raw = vec![("PERSON".to_string(), None, RawBox { x1: 0.1, y1: 0.1, x2: 0.3, y2: 0.3 })];
        let boxes = normalize_boxes(&raw, 800.0, 600.0);
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].width - 0.2).abs() < 1e-3);
    }
}
