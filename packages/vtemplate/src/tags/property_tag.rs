//! `<vt:property var="time" field="Now" type="$clock">`
//!
//! At render time the tag reads `field` from the object named by `type` and
//! stores it in `var` before rendering its children. A `type` that is a
//! variable expression supplies the object directly; a constant `type` is a
//! type name instantiated through the template's type registry.

use super::{missing_attribute, BindContext, CloneContext, TagBehavior};
use crate::error::{ParseErrorKind, RenderError};
use crate::expression::Expression;
use crate::reflect;
use crate::render::Renderer;
use crate::template::{Tag, VariableRef};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTag {
    pub variable: Option<VariableRef>,
    pub field: Option<String>,
    pub type_expression: Option<Expression>,
}

impl TagBehavior for PropertyTag {
    fn tag_name(&self) -> &'static str {
        "property"
    }

    fn on_adding_attribute(
        &mut self,
        cx: &mut BindContext<'_>,
        name: &str,
        value: &str,
    ) -> Result<(), ParseErrorKind> {
        match name {
            "field" => {
                let field = value.trim();
                self.field = (!field.is_empty()).then(|| field.to_string());
            }
            "type" => self.type_expression = Some(cx.expression(value.trim())?),
            "var" => self.variable = cx.variable(value),
            _ => {}
        }
        Ok(())
    }

    fn process_begin_tag(
        &mut self,
        _cx: &mut BindContext<'_>,
        closed: bool,
    ) -> Result<bool, ParseErrorKind> {
        if self.variable.is_none() {
            return Err(missing_attribute(self.tag_name(), "var"));
        }
        if self.field.is_none() {
            return Err(missing_attribute(self.tag_name(), "field"));
        }
        if self.type_expression.is_none() {
            return Err(missing_attribute(self.tag_name(), "type"));
        }
        Ok(!closed)
    }

    fn render(&self, tag: &Tag, renderer: &mut Renderer<'_>) -> Result<(), RenderError> {
        if let (Some(variable), Some(field), Some(type_expression)) =
            (&self.variable, &self.field, &self.type_expression)
        {
            let instance = match type_expression {
                Expression::Variable(exp) => exp.get_value(renderer.store())?,
                Expression::Constant(constant) => {
                    renderer.types().create_instance(&constant.value)?
                }
            };
            let value = if instance.is_null() {
                Value::Null
            } else {
                reflect::get_member(&instance, field, false)?
            };
            renderer.store_mut().set(variable.id, value);
        }
        renderer.render_children(&tag.children)
    }

    fn clone_tag(&self, cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind> {
        Ok(PropertyTag {
            variable: self.variable.as_ref().map(|variable| cx.variable(variable)),
            field: self.field.clone(),
            type_expression: self
                .type_expression
                .as_ref()
                .map(|exp| cx.expression(exp))
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ScopeId, Template};

    fn bind(attrs: &[(&str, &str)]) -> Result<bool, ParseErrorKind> {
        let mut template = Template::new();
        let mut tag = PropertyTag::default();
        let mut cx = BindContext::new(&mut template, ScopeId::ROOT);
        for (name, value) in attrs {
            tag.on_adding_attribute(&mut cx, name, value)?;
        }
        tag.process_begin_tag(&mut cx, false)
    }

    #[test]
    fn test_requires_all_attributes() {
        assert_eq!(
            bind(&[("field", "Now"), ("type", "$clock")]),
            Err(missing_attribute("property", "var"))
        );
        assert_eq!(
            bind(&[("var", "t"), ("field", "  "), ("type", "$clock")]),
            Err(missing_attribute("property", "field"))
        );
        assert_eq!(
            bind(&[("var", "t"), ("field", "Now")]),
            Err(missing_attribute("property", "type"))
        );
        assert_eq!(bind(&[("var", "t"), ("field", "Now"), ("type", "Clock")]), Ok(true));
    }

    #[test]
    fn test_type_attribute_forms() {
        let mut template = Template::new();
        let mut tag = PropertyTag::default();
        let mut cx = BindContext::new(&mut template, ScopeId::ROOT);
        tag.on_adding_attribute(&mut cx, "type", "$clock").unwrap();
        assert!(tag.type_expression.as_ref().unwrap().is_variable());
        tag.on_adding_attribute(&mut cx, "type", "Clock").unwrap();
        assert_eq!(tag.type_expression, Some(Expression::constant("Clock")));
    }
}
