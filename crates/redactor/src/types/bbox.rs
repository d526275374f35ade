use serde::{Deserialize, Serialize};

/// Which detection pipeline produced a `BoundingBox`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundingBoxSource {
    OcrHas,
    GlmVision,
    Manual,
}

/// A detected visual region in unit coordinates `[0,1]` relative to the
/// EXIF-corrected original image.
///
/// Invariants: `0 <= x`, `0 <= y`, `x + width <= 1`, `y + height <= 1`,
/// `width > 0`, `height > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub page: Option<u32>,
    #[serde(rename = "type")]
    pub type_id: String,
    pub text: Option<String>,
    pub selected: bool,
    pub source: BoundingBoxSource,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn new(
        type_id: impl Into<String>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        source: BoundingBoxSource,
        confidence: f32,
    ) -> Self {
        Self {
            id: String::new(),
            x,
            y,
            width,
            height,
            page: None,
            type_id: type_id.into(),
            text: None,
            selected: true,
            source,
            confidence,
        }
    }

    /// `true` when the box satisfies the unit-coordinate invariants (with a
    /// small epsilon to absorb floating point error at the unit boundary).
    pub fn is_valid(&self, eps: f32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= 1.0 + eps
            && self.y + self.height <= 1.0 + eps
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Intersection-over-union against another box, in unit coordinates.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ax2 = self.x + self.width;
        let ay2 = self.y + self.height;
        let bx2 = other.x + other.width;
        let by2 = other.y + other.height;

        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = ax2.min(bx2);
        let iy2 = ay2.min(by2);

        let iw = (ix2 - ix1).max(0.0);
        let ih = (iy2 - iy1).max(0.0);
        let intersection = iw * ih;
        if intersection <= 0.0 {
            return 0.0;
        }

        let area_a = self.width * self.height;
        let area_b = other.width * other.height;
        let union = area_a + area_b - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }
}

/// A raw OCR detection: text plus a quadrilateral polygon in pixel coordinates
/// on the submitted image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OCRTextBlock {
    pub text: String,
    /// Four `(x, y)` points in pixels, clockwise from top-left.
    pub quad: [(f32, f32); 4],
    pub confidence: f32,
    pub label: String,
}

impl OCRTextBlock {
    /// Axis-aligned bounding rectangle of the quad, in pixels.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = self.quad.map(|p| p.0);
        let ys = self.quad.map(|p| p.1);
        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        (min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn is_seal(&self) -> bool {
        self.label == "seal"
    }

    pub fn is_table(&self) -> bool {
        self.text.contains("<table") || self.text.contains("<TABLE")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_at(x: f32, y: f32, w: f32, h: f32, source: BoundingBoxSource) -> BoundingBox {
        BoundingBox::new("SEAL", x, y, w, h, source, 0.9)
    }

    #[test]
    fn test_is_valid_rejects_out_of_unit_box() {
        let b = box_at(0.5, 0.5, 0.6, 0.1, BoundingBoxSource::OcrHas);
        assert!(!b.is_valid(1e-4));
    }

    #[test]
    fn test_is_valid_accepts_boundary_box() {
        let b = box_at(0.0, 0.0, 1.0, 1.0, BoundingBoxSource::OcrHas);
        assert!(b.is_valid(1e-4));
    }

    #[test]
    fn test_iou_identical_boxes_is_one() {
        let a = box_at(0.1, 0.1, 0.2, 0.2, BoundingBoxSource::OcrHas);
        let b = a.clone();
        assert!((a.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes_is_zero() {
        let a = box_at(0.0, 0.0, 0.1, 0.1, BoundingBoxSource::OcrHas);
        let b = box_at(0.5, 0.5, 0.1, 0.1, BoundingBoxSource::GlmVision);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_seal_overlap_matches_seed_scenario_e() {
        let ocr = box_at(0.10, 0.80, 0.20, 0.10, BoundingBoxSource::OcrHas);
        let vlm = box_at(0.09, 0.79, 0.22, 0.12, BoundingBoxSource::GlmVision);
        assert!(ocr.iou(&vlm) > 0.3);
    }

    #[test]
    fn test_quad_rect_recovers_bounding_box() {
        let block = OCRTextBlock {
            text: "hi".into(),
            quad: [(10.0, 10.0), (110.0, 10.0), (110.0, 30.0), (10.0, 30.0)],
            confidence: 0.9,
            label: "text".into(),
        };
        assert_eq!(block.rect(), (10.0, 10.0, 100.0, 20.0));
    }
}
