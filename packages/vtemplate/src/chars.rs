/*
 * Character Codes
 *
 * Markup characters recognised by the template scanner.
 */

//! Character constants used throughout the engine

// Special characters
pub const NEWLINE: char = '\n';
pub const RETURN: char = '\r';

// Markup
pub const DOLLAR: char = '$';
pub const HASH: char = '#';
pub const PERIOD: char = '.';
pub const AMPERSAND: char = '&';
pub const SEMICOLON: char = ';';
pub const LT: char = '<';
pub const GT: char = '>';
pub const DQ: char = '"';
pub const SQ: char = '\'';

// Placeholder in the `format` attribute of variable tags
pub const FORMAT_SLOT: &str = "{0}";

/// Check if character is newline
pub fn is_new_line(ch: char) -> bool {
    ch == NEWLINE || ch == RETURN
}

/// Check if character must be escaped when emitted as HTML text
pub fn is_html_special(ch: char) -> bool {
    matches!(ch, LT | GT | AMPERSAND | DQ | SQ)
}
