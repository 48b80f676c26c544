//! Variable placeholders: `$name.field` and `{$name.field attr="..."}`.

use super::{invalid_attribute, BindContext, CloneContext, TagBehavior};
use crate::chars;
use crate::error::{ParseErrorKind, RenderError};
use crate::expression::VariableExpression;
use crate::ml_parser::entities::encode_html;
use crate::render::Renderer;
use crate::template::Tag;
use crate::value::Value;

pub const VARIABLE_TAG_NAME: &str = "variable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCase {
    Upper,
    Lower,
}

/// Output formatting driven by placeholder attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableFormat {
    /// Written when the value renders as empty text.
    pub default: Option<String>,
    pub case: Option<TextCase>,
    /// Maximum number of characters.
    pub length: Option<usize>,
    pub html_encode: bool,
    /// Pattern in which `{0}` is replaced by the value.
    pub format: Option<String>,
}

impl VariableFormat {
    pub fn apply(&self, value: &Value) -> String {
        let mut text = value.to_text();
        if text.is_empty() {
            if let Some(default) = &self.default {
                text = default.clone();
            }
        }
        match self.case {
            Some(TextCase::Upper) => text = text.to_uppercase(),
            Some(TextCase::Lower) => text = text.to_lowercase(),
            None => {}
        }
        if let Some(length) = self.length {
            if text.chars().count() > length {
                text = text.chars().take(length).collect();
            }
        }
        if self.html_encode {
            text = encode_html(&text).into_owned();
        }
        match &self.format {
            Some(format) => format.replace(chars::FORMAT_SLOT, &text),
            None => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableTag {
    pub expression: VariableExpression,
    pub format: VariableFormat,
}

impl VariableTag {
    pub fn new(expression: VariableExpression) -> Self {
        VariableTag {
            expression,
            format: VariableFormat::default(),
        }
    }
}

impl TagBehavior for VariableTag {
    fn tag_name(&self) -> &'static str {
        VARIABLE_TAG_NAME
    }

    fn is_single(&self) -> bool {
        true
    }

    fn on_adding_attribute(
        &mut self,
        _cx: &mut BindContext<'_>,
        name: &str,
        value: &str,
    ) -> Result<(), ParseErrorKind> {
        let invalid = || invalid_attribute(VARIABLE_TAG_NAME, name, value);
        match name {
            "default" => self.format.default = Some(value.to_string()),
            "format" => self.format.format = Some(value.to_string()),
            "case" => {
                self.format.case = match value.trim().to_ascii_lowercase().as_str() {
                    "upper" => Some(TextCase::Upper),
                    "lower" => Some(TextCase::Lower),
                    _ => return Err(invalid()),
                }
            }
            "length" => {
                self.format.length = Some(value.trim().parse().map_err(|_| invalid())?)
            }
            "htmlencode" => {
                self.format.html_encode = match value.trim().to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return Err(invalid()),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn render(&self, _tag: &Tag, renderer: &mut Renderer<'_>) -> Result<(), RenderError> {
        let value = self.expression.get_value(renderer.store())?;
        renderer.write_str(&self.format.apply(&value))
    }

    fn clone_tag(&self, cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind> {
        Ok(VariableTag {
            expression: cx.variable_expression(&self.expression)?,
            format: self.format.clone(),
        })
    }
}
