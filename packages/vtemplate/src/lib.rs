#![deny(clippy::all)]

/*
 * vtemplate - Variable Template Engine
 *
 * Parses text templates with `$variable` placeholders and `<vt:...>` tags
 * into a bound element tree, then renders it against variable values.
 */

pub mod chars;
pub mod config;
pub mod error;
pub mod expression;
pub mod ml_parser;
pub mod parse_util;
pub mod reflect;
pub mod render;
pub mod tags;
pub mod template;
pub mod value;

// Re-exports
pub use config::TemplateConfig;
pub use error::{ParseError, ParseErrorKind, RenderError, Result, TemplateError};
pub use expression::{Accessor, Expression, ScopePrefix, VariableExpression};
pub use ml_parser::Parser;
pub use reflect::TypeRegistry;
pub use tags::{TagBehavior, TagFactory, TagKind};
pub use template::{Node, NodeId, Scope, ScopeId, Tag, Template, TextNode, VariableId};
pub use value::{HostObject, Value};

/// Parse `source` with the default configuration and tag set.
pub fn parse(source: &str) -> std::result::Result<Template, ParseError> {
    Parser::default().parse(source)
}

/// Parse `source`, assign `variables` in the root scope and render it.
pub fn render_template<I, K, V>(source: &str, variables: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut template = parse(source)?;
    for (name, value) in variables {
        template.set_variable(name.as_ref(), value);
    }
    Ok(template.render_to_string()?)
}
