//! `<vt:set var="title" value="$page.title" />`

use super::{missing_attribute, BindContext, CloneContext, TagBehavior};
use crate::error::{ParseErrorKind, RenderError};
use crate::expression::Expression;
use crate::render::Renderer;
use crate::template::{Tag, VariableRef};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetTag {
    pub variable: Option<VariableRef>,
    pub value: Option<Expression>,
}

impl TagBehavior for SetTag {
    fn tag_name(&self) -> &'static str {
        "set"
    }

    fn is_single(&self) -> bool {
        true
    }

    fn on_adding_attribute(
        &mut self,
        cx: &mut BindContext<'_>,
        name: &str,
        value: &str,
    ) -> Result<(), ParseErrorKind> {
        match name {
            "var" => self.variable = cx.variable(value),
            "value" => self.value = Some(cx.expression(value)?),
            _ => {}
        }
        Ok(())
    }

    fn process_begin_tag(
        &mut self,
        _cx: &mut BindContext<'_>,
        _closed: bool,
    ) -> Result<bool, ParseErrorKind> {
        if self.variable.is_none() {
            return Err(missing_attribute(self.tag_name(), "var"));
        }
        if self.value.is_none() {
            return Err(missing_attribute(self.tag_name(), "value"));
        }
        Ok(false)
    }

    fn render(&self, _tag: &Tag, renderer: &mut Renderer<'_>) -> Result<(), RenderError> {
        if let (Some(variable), Some(value)) = (&self.variable, &self.value) {
            let value = value.get_value(renderer.store())?;
            renderer.store_mut().set(variable.id, value);
        }
        Ok(())
    }

    fn clone_tag(&self, cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind> {
        Ok(SetTag {
            variable: self.variable.as_ref().map(|variable| cx.variable(variable)),
            value: self.value.as_ref().map(|exp| cx.expression(exp)).transpose()?,
        })
    }
}
