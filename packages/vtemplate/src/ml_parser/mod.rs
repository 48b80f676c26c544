//! Markup Parser Module
//!
//! Scans template source for engine markup and builds the bound element
//! tree of a [`Template`](crate::template::Template).

pub mod entities;
pub mod parser;
pub mod patterns;

pub use entities::{decode_entities, encode_html};
pub use parser::Parser;
pub use patterns::{AttributeMatch, MatchKind, Patterns, TemplateMatch, VariableMatch};
