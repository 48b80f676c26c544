//! Parse Utilities
//!
//! Source locations attached to parse errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chars;

/// Position inside template source. `line` and `col` are 1-based, `col`
/// counts characters rather than bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseLocation {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl ParseLocation {
    pub fn new(offset: usize, line: usize, col: usize) -> Self {
        ParseLocation { offset, line, col }
    }

    /// Locate a byte offset by scanning the consumed text for line breaks.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = clamp_to_char_boundary(source, offset);
        let mut line = 1;
        let mut col = 1;
        for ch in source[..offset].chars() {
            if ch == chars::NEWLINE {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        ParseLocation::new(offset, line, col)
    }
}

impl fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Text starting at `offset`, cut at the first line break or after
/// `max_chars` characters.
pub fn snippet(source: &str, offset: usize, max_chars: usize) -> String {
    let offset = clamp_to_char_boundary(source, offset);
    source[offset..]
        .chars()
        .take_while(|ch| !chars::is_new_line(*ch))
        .take(max_chars)
        .collect()
}

fn clamp_to_char_boundary(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_first_line() {
        let loc = ParseLocation::from_offset("abc", 2);
        assert_eq!(loc, ParseLocation::new(2, 1, 3));
    }

    #[test]
    fn test_location_after_line_breaks() {
        let loc = ParseLocation::from_offset("a\nbc\nd", 5);
        assert_eq!((loc.line, loc.col), (3, 1));
        let loc = ParseLocation::from_offset("a\nbc\nd", 3);
        assert_eq!((loc.line, loc.col), (2, 2));
    }

    #[test]
    fn test_location_counts_characters() {
        let loc = ParseLocation::from_offset("héllo", 3);
        assert_eq!(loc.col, 3);
    }

    #[test]
    fn test_location_clamps_offset() {
        let loc = ParseLocation::from_offset("ab", 10);
        assert_eq!(loc.offset, 2);
        assert_eq!(loc.to_string(), "1:3");
    }

    #[test]
    fn test_snippet_stops_at_line_break() {
        assert_eq!(snippet("<vt:if>\nbody", 0, 40), "<vt:if>");
        assert_eq!(snippet("abcdef", 2, 3), "cde");
    }
}
