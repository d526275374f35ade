//! PDF writer: searches each page for a replaced span's original text, covers
//! every match with a white rectangle, then draws the replacement at the
//! original baseline.
//!
//! Grounded on the teacher's `pdf/text.rs` (pdfium-render document loading
//! convention); the search+cover+redraw sequence itself comes from
//! `redactor.py`'s PDF writer, which drives PyMuPDF's `search_for`.

use std::collections::HashMap;

use pdfium_render::prelude::*;

use crate::error::{RedactorError, Result};

const BASELINE_FONT_SIZE: f32 = 10.0;

/// Rewrites every occurrence of a mapped key in `pdf_bytes`, searching page
/// by page and replacing in descending length order so a longer match is
/// never partially clobbered by a shorter one that is also a substring of it.
pub fn redact_pdf(pdf_bytes: &[u8], entity_map: &HashMap<String, String>) -> Result<Vec<u8>> {
    let pdfium = Pdfium::bind_to_system_library()
        .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")))
        .map_err(|e| RedactorError::internal(format!("failed to bind pdfium: {e}")))?;
    let pdfium = Pdfium::new(pdfium);

    let mut document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| RedactorError::invalid_input(format!("unreadable PDF: {e}")))?;

    let mut needles: Vec<(&String, &String)> = entity_map.iter().collect();
    needles.sort_by_key(|(original, _)| std::cmp::Reverse(original.chars().count()));

    for mut page in document.pages_mut().iter() {
        for (original, replacement) in &needles {
            let matches = find_matches(&page, original)?;
            for bounds in matches {
                cover_with_white(&mut page, bounds)?;
                draw_replacement(&mut page, bounds, replacement)?;
            }
        }
    }

    document.save_to_bytes().map_err(|e| RedactorError::internal(format!("failed to serialize PDF: {e}")))
}

fn find_matches(page: &PdfPage, needle: &str) -> Result<Vec<PdfRect>> {
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let text = page.text().map_err(|e| RedactorError::internal(format!("PDF page has no text layer: {e}")))?;
    let mut search = text.search(needle, PdfSearchOptions::new());
    let mut bounds = Vec::new();
    while let Some(segments) = search.find_next() {
        for segment in segments.iter() {
            bounds.push(segment.bounds());
        }
    }
    Ok(bounds)
}

fn cover_with_white(page: &mut PdfPage, bounds: PdfRect) -> Result<()> {
    let rect = PdfPagePathObject::new_rect(
        page.document(),
        bounds,
        None,
        None,
        Some(PdfColor::WHITE),
    )
    .map_err(|e| RedactorError::internal(format!("failed to create cover rectangle: {e}")))?;
    page.objects_mut()
        .add_path_object(rect)
        .map_err(|e| RedactorError::internal(format!("failed to add cover rectangle: {e}")))?;
    Ok(())
}

fn draw_replacement(page: &mut PdfPage, bounds: PdfRect, replacement: &str) -> Result<()> {
    let font = page.document().fonts_mut().helvetica();
    let mut text_object = PdfPageTextObject::new(page.document(), replacement, font, PdfPoints::new(BASELINE_FONT_SIZE))
        .map_err(|e| RedactorError::internal(format!("failed to create replacement text: {e}")))?;
    text_object
        .set_fill_color(PdfColor::BLACK)
        .map_err(|e| RedactorError::internal(format!("failed to color replacement text: {e}")))?;
    text_object
        .translate(bounds.left(), bounds.bottom())
        .map_err(|e| RedactorError::internal(format!("failed to place replacement text: {e}")))?;
    page.objects_mut()
        .add_text_object(text_object)
        .map_err(|e| RedactorError::internal(format!("failed to add replacement text: {e}")))?;
    Ok(())
}
