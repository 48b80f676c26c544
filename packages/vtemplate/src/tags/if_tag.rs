//! `<vt:if var="$x" value="y" compare="!=">`

use super::{invalid_attribute, missing_attribute, BindContext, CloneContext, TagBehavior};
use crate::error::{ParseErrorKind, RenderError};
use crate::expression::Expression;
use crate::render::Renderer;
use crate::template::Tag;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Comparison {
    #[default]
    Equal,
    NotEqual,
}

impl Comparison {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => Some(Comparison::Equal),
            "!=" | "<>" | "ne" => Some(Comparison::NotEqual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IfTag {
    pub condition: Option<Expression>,
    /// Compared against the condition as text; truthiness when absent.
    pub value: Option<Expression>,
    pub compare: Comparison,
}

impl IfTag {
    fn holds(&self, renderer: &Renderer<'_>) -> Result<bool, RenderError> {
        let Some(condition) = &self.condition else {
            return Ok(false);
        };
        let current = condition.get_value(renderer.store())?;
        let matched = match &self.value {
            Some(value) => current.to_text() == value.get_value(renderer.store())?.to_text(),
            None => current.is_truthy(),
        };
        Ok(match self.compare {
            Comparison::Equal => matched,
            Comparison::NotEqual => !matched,
        })
    }
}

impl TagBehavior for IfTag {
    fn tag_name(&self) -> &'static str {
        "if"
    }

    fn on_adding_attribute(
        &mut self,
        cx: &mut BindContext<'_>,
        name: &str,
        value: &str,
    ) -> Result<(), ParseErrorKind> {
        match name {
            "var" => self.condition = Some(cx.expression(value.trim())?),
            "value" => self.value = Some(cx.expression(value)?),
            "compare" => {
                self.compare = Comparison::parse(value)
                    .ok_or_else(|| invalid_attribute("if", name, value))?
            }
            _ => {}
        }
        Ok(())
    }

    fn process_begin_tag(
        &mut self,
        _cx: &mut BindContext<'_>,
        closed: bool,
    ) -> Result<bool, ParseErrorKind> {
        if self.condition.is_none() {
            return Err(missing_attribute(self.tag_name(), "var"));
        }
        Ok(!closed)
    }

    fn render(&self, tag: &Tag, renderer: &mut Renderer<'_>) -> Result<(), RenderError> {
        if self.holds(renderer)? {
            renderer.render_children(&tag.children)?;
        }
        Ok(())
    }

    fn clone_tag(&self, cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind> {
        Ok(IfTag {
            condition: self.condition.as_ref().map(|exp| cx.expression(exp)).transpose()?,
            value: self.value.as_ref().map(|exp| cx.expression(exp)).transpose()?,
            compare: self.compare,
        })
    }
}
