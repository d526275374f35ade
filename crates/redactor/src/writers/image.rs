//! Raster writer: fills each selected bounding box with solid black over the
//! source image and re-encodes to PNG.

use image::{DynamicImage, Rgba};

use crate::error::{RedactorError, Result};
use crate::types::BoundingBox;

/// Fills every `selected` box's pixel rectangle with solid black, leaving
/// unselected boxes untouched.
pub fn redact_image(image_bytes: &[u8], boxes: &[BoundingBox]) -> Result<Vec<u8>> {
    let mut img = image::load_from_memory(image_bytes).map_err(|e| RedactorError::invalid_input(format!("unreadable image: {e}")))?;
    let (width, height) = (img.width(), img.height());

    for bbox in boxes.iter().filter(|b| b.selected) {
        let x0 = (bbox.x * width as f32).round().max(0.0) as u32;
        let y0 = (bbox.y * height as f32).round().max(0.0) as u32;
        let x1 = ((bbox.x + bbox.width) * width as f32).round().min(width as f32) as u32;
        let y1 = ((bbox.y + bbox.height) * height as f32).round().min(height as f32) as u32;
        fill_black(&mut img, x0, y0, x1, y1);
    }

    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| RedactorError::internal(format!("failed to encode redacted image: {e}")))?;
    Ok(out)
}

fn fill_black(img: &mut DynamicImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    let mut rgba = img.to_rgba8();
    for y in y0..y1.min(rgba.height()) {
        for x in x0..x1.min(rgba.width()) {
            rgba.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
    *img = DynamicImage::ImageRgba8(rgba);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBoxSource;
    use image::{ImageBuffer, Rgb};

    fn sample_png() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(10, 10, |_, _| Rgb([255, 255, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img).write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn test_redact_image_blacks_out_selected_box() {
        let bytes = sample_png();
        let mut bbox = BoundingBox::new("SEAL", 0.0, 0.0, 0.5, 0.5, BoundingBoxSource::OcrHas, 0.9);
        bbox.selected = true;
        let redacted = redact_image(&bytes, &[bbox]).unwrap();
        let decoded = image::load_from_memory(&redacted).unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
        assert_eq!(*decoded.get_pixel(9, 9), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_unselected_box_is_left_untouched() {
        let bytes = sample_png();
        let mut bbox = BoundingBox::new("SEAL", 0.0, 0.0, 0.5, 0.5, BoundingBoxSource::OcrHas, 0.9);
        bbox.selected = false;
        let redacted = redact_image(&bytes, &[bbox]).unwrap();
        let decoded = image::load_from_memory(&redacted).unwrap().to_rgba8();
        assert_eq!(*decoded.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
    }
}
