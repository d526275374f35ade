//! Table expansion: an OCR block whose text is an HTML `<table>` is split
//! into per-cell virtual blocks by uniform row/column partitioning of the
//! bounding quad, respecting `colspan`. If the lightweight parse fails, the
//! HTML is stripped and the flattened text retained at block geometry.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::OCRTextBlock;

static ROW_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap());
static CELL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?is)<t[dh]([^>]*)>(.*?)</t[dh]>"#).unwrap());
static COLSPAN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"colspan\s*=\s*["']?(\d+)"#).unwrap());
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").unwrap());

struct ParsedCell {
    text: String,
    colspan: usize,
}

fn parse_rows(html: &str) -> Option<Vec<Vec<ParsedCell>>> {
    let mut rows = Vec::new();
    for row_match in ROW_PATTERN.captures_iter(html) {
        let row_html = &row_match[1];
        let mut cells = Vec::new();
        for cell_match in CELL_PATTERN.captures_iter(row_html) {
            let attrs = &cell_match[1];
            let colspan = COLSPAN_PATTERN.captures(attrs).and_then(|c| c[1].parse().ok()).unwrap_or(1).max(1);
            let text = TAG_PATTERN.replace_all(&cell_match[2], "").trim().to_string();
            cells.push(ParsedCell { text, colspan });
        }
        if !cells.is_empty() {
            rows.push(cells);
        }
    }
    if rows.is_empty() { None } else { Some(rows) }
}

/// Expands a `<table>`-bearing OCR block into per-cell virtual blocks.
/// Falls back to a single flattened-text block at the original geometry if
/// the HTML cannot be parsed into any rows.
pub fn expand_table_block(block: &OCRTextBlock) -> Vec<OCRTextBlock> {
    let Some(rows) = parse_rows(&block.text) else {
        let flattened = TAG_PATTERN.replace_all(&block.text, " ").trim().to_string();
        return vec![OCRTextBlock { text: flattened, ..block.clone() }];
    };

    let (left, top, width, height) = block.rect();
    let row_count = rows.len() as f32;
    let total_cols: usize = rows.iter().map(|r| r.iter().map(|c| c.colspan).sum::<usize>()).max().unwrap_or(1).max(1);
    let row_height = height / row_count;
    let col_width = width / total_cols as f32;

    let mut out = Vec::new();
    for (row_idx, row) in rows.into_iter().enumerate() {
        let mut col_cursor = 0usize;
        let row_top = top + row_idx as f32 * row_height;
        for cell in row {
            let cell_left = left + col_cursor as f32 * col_width;
            let cell_width = cell.colspan as f32 * col_width;
            out.push(OCRTextBlock {
                text: cell.text,
                quad: [
                    (cell_left, row_top),
                    (cell_left + cell_width, row_top),
                    (cell_left + cell_width, row_top + row_height),
                    (cell_left, row_top + row_height),
                ],
                confidence: block.confidence * 0.9,
                label: "text".to_string(),
            });
            col_cursor += cell.colspan;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_block(html: &str) -> OCRTextBlock {
        OCRTextBlock {
            text: html.to_string(),
            quad: [(0.0, 0.0), (100.0, 0.0), (100.0, 40.0), (0.0, 40.0)],
            confidence: 1.0,
            label: "table".to_string(),
        }
    }

    #[test]
    fn test_expands_simple_two_by_two_table() {
        let html = "<table><tr><td>A</td><td>B</td></tr><tr><td>C</td><td>D</td></tr></table>";
        let cells = expand_table_block(&table_block(html));
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].text, "A");
        assert_eq!(cells[0].confidence, 0.9);
    }

    #[test]
    fn test_colspan_widens_cell() {
        let html = "<table><tr><td colspan=\"2\">Wide</td></tr><tr><td>C</td><td>D</td></tr></table>";
        let cells = expand_table_block(&table_block(html));
        let wide = &cells[0];
        let (_, _, width, _) = wide.rect();
        let (_, _, narrow_width, _) = cells[1].rect();
        assert!(width > narrow_width);
    }

    #[test]
    fn test_unparseable_html_falls_back_to_flattened_text() {
        let block = table_block("<table><notarow>broken");
        let cells = expand_table_block(&block);
        assert_eq!(cells.len(), 1);
        assert!(!cells[0].text.contains('<'));
    }
}
