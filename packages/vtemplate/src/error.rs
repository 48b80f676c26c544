//! Errors raised while parsing and rendering templates.

use std::fmt;

use thiserror::Error;

use crate::parse_util::{snippet, ParseLocation};

/// Longest piece of offending source quoted in a parse error.
const MAX_SNIPPET_CHARS: usize = 60;

/// What went wrong during a parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unknown tag \"{0}\"")]
    UnknownTag(String),

    #[error("tag \"{tag}\" is missing the \"{attribute}\" attribute")]
    MissingAttribute { tag: String, attribute: String },

    #[error("closing tag \"{found}\" {}", describe_open_tag(.expected))]
    UnmatchedTag {
        expected: Option<String>,
        found: String,
    },

    #[error("tag \"{0}\" is never closed")]
    UnclosedTag(String),

    #[error("template reference \"{0}\" does not match any enclosing template")]
    UnknownTemplateReference(String),

    #[error("invalid value \"{value}\" for attribute \"{attribute}\" of tag \"{tag}\"")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        value: String,
    },

    #[error("{0}")]
    ParseFailure(String),
}

fn describe_open_tag(expected: &Option<String>) -> String {
    match expected {
        Some(name) => format!("does not match the open tag \"{}\"", name),
        None => "has no matching open tag".to_string(),
    }
}

/// A parse failure, with the location and text it was raised at when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: Option<ParseLocation>,
    pub text: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        ParseError {
            kind,
            location: None,
            text: None,
        }
    }

    /// Attach the location of `offset` within `source` and quote the text found there.
    pub fn at(kind: ParseErrorKind, source: &str, offset: usize) -> Self {
        ParseError {
            kind,
            location: Some(ParseLocation::from_offset(source, offset)),
            text: Some(snippet(source, offset, MAX_SNIPPET_CHARS)),
        }
    }

    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }

    pub fn line(&self) -> Option<usize> {
        self.location.map(|loc| loc.line)
    }

    pub fn column(&self) -> Option<usize> {
        self.location.map(|loc| loc.col)
    }
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> Self {
        ParseError::new(kind)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.location, &self.text) {
            (Some(loc), Some(text)) => write!(
                f,
                "error parsing \"{}\" at line {}, column {}: {}",
                text, loc.line, loc.col, self.kind
            ),
            (Some(loc), None) => write!(
                f,
                "error parsing template at line {}, column {}: {}",
                loc.line, loc.col, self.kind
            ),
            _ => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Failures while evaluating a bound template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("value of type \"{type_name}\" has no member \"{member}\"")]
    MissingMember { member: String, type_name: String },

    #[error("type \"{0}\" is not registered")]
    UnknownType(String),

    #[error("value of type \"{0}\" cannot be iterated")]
    NotIterable(String),

    #[error("failed to write template output")]
    Write(#[from] fmt::Error),
}

/// Either side of the parse/render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T, E = TemplateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_with_location() {
        let err = ParseError::at(
            ParseErrorKind::UnknownTag("bogus".to_string()),
            "ab\n<vt:bogus/> tail",
            3,
        );
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.column(), Some(1));
        assert_eq!(
            err.to_string(),
            "error parsing \"<vt:bogus/> tail\" at line 2, column 1: unknown tag \"bogus\""
        );
    }

    #[test]
    fn test_message_without_location() {
        let err = ParseError::new(ParseErrorKind::UnknownTemplateReference("#outer".to_string()));
        assert!(!err.has_location());
        assert_eq!(
            err.to_string(),
            "template reference \"#outer\" does not match any enclosing template"
        );
    }

    #[test]
    fn test_unmatched_tag_messages() {
        let kind = ParseErrorKind::UnmatchedTag {
            expected: Some("if".to_string()),
            found: "foreach".to_string(),
        };
        assert_eq!(
            kind.to_string(),
            "closing tag \"foreach\" does not match the open tag \"if\""
        );
        let kind = ParseErrorKind::UnmatchedTag {
            expected: None,
            found: "if".to_string(),
        };
        assert_eq!(kind.to_string(), "closing tag \"if\" has no matching open tag");
    }

    #[test]
    fn test_template_error_is_transparent() {
        let err: TemplateError = RenderError::UnknownType("Clock".to_string()).into();
        assert_eq!(err.to_string(), "type \"Clock\" is not registered");
    }
}
