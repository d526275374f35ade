//! Byte-offset to character-offset conversion.
//!
//! `regex::Regex` and `str::match_indices` both report UTF-8 byte offsets,
//! but `Entity.start`/`Entity.end` are documented as half-open character
//! offsets. `ByteToChar` builds the byte->char mapping once per document so
//! detectors can keep doing byte-based slicing internally (required by
//! `&str` indexing) and convert only at the point an `Entity` is built.

/// Byte offset of the start of each char in a string, plus a trailing
/// sentinel for the string's total byte length.
pub(crate) struct ByteToChar {
    boundaries: Vec<usize>,
}

impl ByteToChar {
    pub(crate) fn new(s: &str) -> Self {
        let mut boundaries: Vec<usize> = s.char_indices().map(|(b, _)| b).collect();
        boundaries.push(s.len());
        Self { boundaries }
    }

    /// Converts a byte offset to a character offset. `byte` must land on a
    /// char boundary, same contract as `str` slicing.
    pub(crate) fn char_offset(&self, byte: usize) -> usize {
        self.boundaries
            .binary_search(&byte)
            .unwrap_or_else(|_| panic!("byte offset {byte} does not fall on a char boundary"))
    }

    pub(crate) fn char_span(&self, start: usize, end: usize) -> (usize, usize) {
        (self.char_offset(start), self.char_offset(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_offsets_are_unchanged() {
        let map = ByteToChar::new("hello world");
        assert_eq!(map.char_span(0, 5), (0, 5));
        assert_eq!(map.char_span(6, 11), (6, 11));
    }

    #[test]
    fn test_seed_scenario_a_byte_span_converts_to_char_span() {
        let map = ByteToChar::new("联系电话：13812345678。");
        assert_eq!(map.char_span(15, 26), (5, 16));
    }

    #[test]
    fn test_repeated_cjk_name_spans() {
        let map = ByteToChar::new("张三向张三的朋友李四转账。");
        assert_eq!(map.char_span(0, 6), (0, 2));
        assert_eq!(map.char_span(9, 15), (3, 5));
        assert_eq!(map.char_span(24, 30), (8, 10));
    }
}
