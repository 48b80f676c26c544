//! `<vt:foreach from="$rows" item="row" index="i">`
//!
//! Renders the children once per list element with `item` set to the
//! element and `index` to its 1-based position.

use super::{missing_attribute, BindContext, CloneContext, TagBehavior};
use crate::error::{ParseErrorKind, RenderError};
use crate::expression::Expression;
use crate::render::Renderer;
use crate::template::{Tag, VariableRef};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForEachTag {
    pub from: Option<Expression>,
    pub item: Option<VariableRef>,
    pub index: Option<VariableRef>,
}

impl TagBehavior for ForEachTag {
    fn tag_name(&self) -> &'static str {
        "foreach"
    }

    fn on_adding_attribute(
        &mut self,
        cx: &mut BindContext<'_>,
        name: &str,
        value: &str,
    ) -> Result<(), ParseErrorKind> {
        match name {
            "from" => self.from = Some(cx.expression(value.trim())?),
            "item" => self.item = cx.variable(value),
            "index" => self.index = cx.variable(value),
            _ => {}
        }
        Ok(())
    }

    fn process_begin_tag(
        &mut self,
        _cx: &mut BindContext<'_>,
        closed: bool,
    ) -> Result<bool, ParseErrorKind> {
        if self.from.is_none() {
            return Err(missing_attribute(self.tag_name(), "from"));
        }
        if self.item.is_none() {
            return Err(missing_attribute(self.tag_name(), "item"));
        }
        Ok(!closed)
    }

    fn render(&self, tag: &Tag, renderer: &mut Renderer<'_>) -> Result<(), RenderError> {
        let (Some(from), Some(item)) = (&self.from, &self.item) else {
            return Ok(());
        };
        let items = match from.get_value(renderer.store())? {
            Value::Null => return Ok(()),
            Value::List(items) => items,
            other => return Err(RenderError::NotIterable(other.type_name().to_string())),
        };
        for (position, value) in items.into_iter().enumerate() {
            renderer.store_mut().set(item.id, value);
            if let Some(index) = &self.index {
                renderer.store_mut().set(index.id, Value::from(position + 1));
            }
            renderer.render_children(&tag.children)?;
        }
        Ok(())
    }

    fn clone_tag(&self, cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind> {
        Ok(ForEachTag {
            from: self.from.as_ref().map(|exp| cx.expression(exp)).transpose()?,
            item: self.item.as_ref().map(|variable| cx.variable(variable)),
            index: self.index.as_ref().map(|variable| cx.variable(variable)),
        })
    }
}
