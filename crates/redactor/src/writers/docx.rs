//! DOCX writer: rewrites matched substrings across paragraph runs in place
//! without destroying or re-creating runs, so font/size/color/east-Asian
//! style survive the substitution.
//!
//! Grounded on the teacher's `extraction/docx.rs` (docx handling conventions
//! in this codebase) and `redactor.py`'s run-rewriting writer; uses `docx-rs`
//! for the document object model, the same crate the pack's `docling_rs`
//! example reaches for when it needs to manipulate `.docx` structure.

use std::collections::HashMap;

use docx_rs::{Docx, DocumentChild, Paragraph, ParagraphChild, Run, RunChild, Text, read_docx};

use crate::error::{RedactorError, Result};

/// Rewrites every occurrence of a mapped key across the document's
/// paragraphs, longest match first so "张三丰" is never partially consumed by
/// a replacement targeting "张三".
pub fn redact_docx(docx_bytes: &[u8], entity_map: &HashMap<String, String>) -> Result<Vec<u8>> {
    let docx = read_docx(docx_bytes).map_err(|e| RedactorError::invalid_input(format!("unreadable DOCX: {e}")))?;
    let mut document = docx.document;

    let mut needles: Vec<(&String, &String)> = entity_map.iter().collect();
    needles.sort_by_key(|(original, _)| std::cmp::Reverse(original.chars().count()));

    for child in &mut document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            rewrite_paragraph(paragraph, &needles);
        }
    }

    let docx = Docx { document, ..docx };
    let mut out = Vec::new();
    docx.build()
        .pack(&mut out)
        .map_err(|e| RedactorError::internal(format!("failed to serialize DOCX: {e}")))?;
    Ok(out)
}

fn run_text(run: &Run) -> String {
    let mut text = String::new();
    for child in &run.children {
        if let RunChild::Text(t) = child {
            text.push_str(&t.text);
        }
    }
    text
}

fn set_run_text(run: &mut Run, new_text: &str) {
    let mut wrote = false;
    for child in &mut run.children {
        if let RunChild::Text(t) = child {
            if !wrote {
                t.text = new_text.to_string();
                wrote = true;
            } else {
                t.text.clear();
            }
        }
    }
    if !wrote {
        run.children.push(RunChild::Text(Text::new(new_text)));
    }
}

/// `(run index, char_start, char_end)` for every run in paragraph order.
fn run_spans(paragraph: &Paragraph) -> Vec<(usize, usize, usize)> {
    let mut spans = Vec::new();
    let mut cursor = 0usize;
    for (idx, child) in paragraph.children.iter().enumerate() {
        if let ParagraphChild::Run(run) = child {
            let len = run_text(run).chars().count();
            spans.push((idx, cursor, cursor + len));
            cursor += len;
        }
    }
    spans
}

/// Finds non-overlapping char-index occurrences of `needle`, skipping spans
/// already claimed by an earlier (longer) needle.
fn locate_all(haystack: &[char], needle: &str, claimed: &mut Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    let needle_chars: Vec<char> = needle.chars().collect();
    if needle_chars.is_empty() || needle_chars.len() > haystack.len() {
        return Vec::new();
    }
    let mut found = Vec::new();
    let mut i = 0;
    while i + needle_chars.len() <= haystack.len() {
        if haystack[i..i + needle_chars.len()] == needle_chars[..] {
            let span = (i, i + needle_chars.len());
            let overlaps = claimed.iter().any(|&(s, e)| span.0 < e && s < span.1);
            if !overlaps {
                claimed.push(span);
                found.push(span);
                i += needle_chars.len();
                continue;
            }
        }
        i += 1;
    }
    found
}

fn rewrite_paragraph(paragraph: &mut Paragraph, needles: &[(&String, &String)]) {
    let full_text: String = paragraph
        .children
        .iter()
        .filter_map(|c| if let ParagraphChild::Run(r) = c { Some(run_text(r)) } else { None })
        .collect();
    if full_text.is_empty() {
        return;
    }
    let chars: Vec<char> = full_text.chars().collect();

    let mut claimed = Vec::new();
    let mut matches: Vec<(usize, usize, String)> = Vec::new();
    for (original, replacement) in needles {
        for (start, end) in locate_all(&chars, original, &mut claimed) {
            matches.push((start, end, (*replacement).clone()));
        }
    }
    if matches.is_empty() {
        return;
    }

    let spans = run_spans(paragraph);

    for (start, end, replacement) in &matches {
        let overlapping: Vec<&(usize, usize, usize)> = spans.iter().filter(|(_, s, e)| *start < *e && *s < *end).collect();
        let Some((majority_idx, ..)) =
            overlapping.iter().max_by_key(|(_, s, e)| (*e).min(*end) - (*s).max(*start)).map(|(i, s, e)| (*i, *s, *e))
        else {
            continue;
        };

        for (idx, _, _) in &overlapping {
            if let Some(ParagraphChild::Run(run)) = paragraph.children.get_mut(*idx) {
                if *idx == majority_idx {
                    set_run_text(run, replacement);
                } else {
                    set_run_text(run, "");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_all_claims_longest_match_first() {
        let chars: Vec<char> = "张三丰是宗师".chars().collect();
        let mut claimed = Vec::new();
        let long_hits = locate_all(&chars, "张三丰", &mut claimed);
        assert_eq!(long_hits, vec![(0, 3)]);
        let short_hits = locate_all(&chars, "张三", &mut claimed);
        assert!(short_hits.is_empty(), "shorter needle must not re-claim an already-covered span");
    }

    #[test]
    fn test_locate_all_finds_repeated_occurrences() {
        let chars: Vec<char> = "张三和张三".chars().collect();
        let mut claimed = Vec::new();
        let hits = locate_all(&chars, "张三", &mut claimed);
        assert_eq!(hits, vec![(0, 2), (3, 5)]);
    }

    #[test]
    fn test_run_spans_accumulate_char_lengths() {
        let paragraph = Paragraph::new().add_run(Run::new().add_text("ab")).add_run(Run::new().add_text("cde"));
        let spans = run_spans(&paragraph);
        assert_eq!(spans, vec![(0, 0, 2), (1, 2, 5)]);
    }
}
