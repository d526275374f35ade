//! Dual-Pipeline Fuser: runs the OCR+NER sub-pipeline and the VLM detector
//! concurrently, then merges their boxes with OCR given precedence.
//!
//! Grounded on the source `hybrid_vision_service.detect`: `asyncio.gather`
//! becomes `tokio::join!`; a pipeline whose enabled-type list is empty is
//! skipped rather than invoked with nothing to look for.

use crate::error::RedactorWarning;
use crate::ner::TextNerClient;
use crate::ocr::OcrClient;
use crate::taxonomy::TaxonomyRegistry;
use crate::types::{BoundingBox, BoundingBoxSource};
use crate::vlm::VlmDetector;

use super::ocr_ner_pipeline;

const FUSION_IOU_THRESHOLD: f32 = 0.3;

/// Output of a full vision-detection pass over one image.
pub struct FusedDetection {
    pub boxes: Vec<BoundingBox>,
    pub warnings: Vec<RedactorWarning>,
}

/// Runs both sub-pipelines concurrently and fuses their results.
///
/// `ocr_enabled_type_ids` and `vlm_enabled_type_ids` are independent: a type
/// enabled for one pipeline need not be enabled for the other. An empty list
/// skips that pipeline entirely rather than invoking it with nothing to detect.
pub async fn detect(
    ocr: &OcrClient,
    ner_client: &TextNerClient,
    vlm: &VlmDetector,
    image_bytes: &[u8],
    width: f32,
    height: f32,
    registry: &TaxonomyRegistry,
    ocr_enabled_type_ids: &[String],
    vlm_enabled_type_ids: &[String],
) -> FusedDetection {
    let ocr_future = async {
        if ocr_enabled_type_ids.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            ocr_ner_pipeline::run(ocr, ner_client, image_bytes, width, height, registry, ocr_enabled_type_ids).await
        }
    };

    let vlm_future = async {
        if vlm_enabled_type_ids.is_empty() {
            Ok(Vec::new())
        } else {
            let enabled: Vec<_> = vlm_enabled_type_ids.iter().filter_map(|id| registry.get(id).ok()).collect();
            vlm.detect(image_bytes, &enabled).await
        }
    };

    let ((ocr_boxes, mut warnings), vlm_result) = tokio::join!(ocr_future, vlm_future);

    let vlm_boxes = match vlm_result {
        Ok(boxes) => boxes,
        Err(err) => {
            warnings.push(RedactorWarning::from_error("vlm", &err));
            Vec::new()
        }
    };

    FusedDetection { boxes: fuse(ocr_boxes, vlm_boxes), warnings }
}

/// Retains all `ocr_has` boxes; drops a `glm_vision` box if it overlaps any
/// retained OCR box with IoU above the fusion threshold; dedupes any
/// remaining `manual`/other-source boxes the same way against the
/// accumulating result.
fn fuse(ocr_boxes: Vec<BoundingBox>, vlm_boxes: Vec<BoundingBox>) -> Vec<BoundingBox> {
    let mut result = ocr_boxes;

    for vlm_box in vlm_boxes {
        let overlaps_ocr = result.iter().any(|b| b.source == BoundingBoxSource::OcrHas && b.iou(&vlm_box) > FUSION_IOU_THRESHOLD);
        if !overlaps_ocr {
            result.push(vlm_box);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(source: BoundingBoxSource, x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox::new("SEAL", x, y, w, h, source, 0.9)
    }

    #[test]
    fn test_seed_scenario_e_vlm_dropped_on_overlap() {
        let ocr = vec![bbox(BoundingBoxSource::OcrHas, 0.10, 0.80, 0.20, 0.10)];
        let vlm = vec![bbox(BoundingBoxSource::GlmVision, 0.09, 0.79, 0.22, 0.12)];
        let fused = fuse(ocr, vlm);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].source, BoundingBoxSource::OcrHas);
    }

    #[test]
    fn test_disjoint_vlm_box_is_retained() {
        let ocr = vec![bbox(BoundingBoxSource::OcrHas, 0.0, 0.0, 0.1, 0.1)];
        let vlm = vec![bbox(BoundingBoxSource::GlmVision, 0.5, 0.5, 0.1, 0.1)];
        let fused = fuse(ocr, vlm);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_all_ocr_boxes_retained_even_when_overlapping_each_other() {
        let ocr = vec![bbox(BoundingBoxSource::OcrHas, 0.0, 0.0, 0.2, 0.2), bbox(BoundingBoxSource::OcrHas, 0.01, 0.01, 0.2, 0.2)];
        let fused = fuse(ocr, Vec::new());
        assert_eq!(fused.len(), 2);
    }
}
