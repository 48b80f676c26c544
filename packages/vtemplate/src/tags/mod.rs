//! Tag kinds and the factory that resolves tag names.
//!
//! Every kind implements [`TagBehavior`]; [`TagKind`] dispatches to them.
//! Parsing drives the hooks in order: `on_adding_attribute` once per
//! attribute, `process_begin_tag` after the open tag, `process_end_tag`
//! when the matching close tag is consumed. Rendering and cloning come
//! later and work on the finished tree.

mod foreach_tag;
mod if_tag;
mod property_tag;
mod set_tag;
mod template_tag;
mod variable_tag;

pub use foreach_tag::ForEachTag;
pub use if_tag::{Comparison, IfTag};
pub use property_tag::PropertyTag;
pub use set_tag::SetTag;
pub use template_tag::TemplateTag;
pub use variable_tag::{TextCase, VariableFormat, VariableTag};

use indexmap::IndexMap;

use crate::error::{ParseErrorKind, RenderError};
use crate::expression::{Expression, VariableExpression};
use crate::render::Renderer;
use crate::template::{ScopeId, Tag, Template, VariableRef};

/// Hooks a tag kind can override.
pub trait TagBehavior {
    fn tag_name(&self) -> &'static str;

    /// Single tags never take children or a closing tag.
    fn is_single(&self) -> bool {
        false
    }

    fn on_adding_attribute(
        &mut self,
        _cx: &mut BindContext<'_>,
        _name: &str,
        _value: &str,
    ) -> Result<(), ParseErrorKind> {
        Ok(())
    }

    /// Validate the bound attributes. Returns whether the tag stays open to
    /// collect children until its closing tag.
    fn process_begin_tag(
        &mut self,
        _cx: &mut BindContext<'_>,
        closed: bool,
    ) -> Result<bool, ParseErrorKind> {
        Ok(!closed && !self.is_single())
    }

    fn process_end_tag(&mut self, _cx: &mut BindContext<'_>) -> Result<(), ParseErrorKind> {
        Ok(())
    }

    fn render(&self, tag: &Tag, renderer: &mut Renderer<'_>) -> Result<(), RenderError> {
        renderer.render_children(&tag.children)
    }

    /// Copy of this tag owned by `cx.owner()`, with variables re-bound there.
    fn clone_tag(&self, cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind>
    where
        Self: Sized;
}

/// Binding access handed to tag hooks during parsing.
pub struct BindContext<'a> {
    template: &'a mut Template,
    owner: ScopeId,
}

impl<'a> BindContext<'a> {
    pub fn new(template: &'a mut Template, owner: ScopeId) -> Self {
        BindContext { template, owner }
    }

    pub fn owner(&self) -> ScopeId {
        self.owner
    }

    pub fn template(&mut self) -> &mut Template {
        self.template
    }

    /// Get or add `name` in the owner scope. A blank name binds nothing.
    pub fn variable(&mut self, name: &str) -> Option<VariableRef> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(VariableRef {
            name: name.to_string(),
            id: self.template.get_or_add_variable(self.owner, name),
        })
    }

    pub fn expression(&mut self, text: &str) -> Result<Expression, ParseErrorKind> {
        self.template.create_expression(self.owner, text)
    }

    pub fn add_scope(&mut self, name: Option<String>) -> ScopeId {
        self.template.add_scope(self.owner, name)
    }
}

/// Re-binding access handed to [`TagBehavior::clone_tag`].
///
/// References are re-bound by variable name in the scope their prefix
/// selects from the new owner. A prefix that does not resolve there is an
/// `UnknownTemplateReference`, unless the copy is being re-rooted, in which
/// case it binds in the re-root scope.
pub struct CloneContext<'a> {
    template: &'a mut Template,
    owner: ScopeId,
    reroot: Option<ScopeId>,
}

impl<'a> CloneContext<'a> {
    pub(crate) fn new(template: &'a mut Template, owner: ScopeId, reroot: Option<ScopeId>) -> Self {
        CloneContext {
            template,
            owner,
            reroot,
        }
    }

    pub fn owner(&self) -> ScopeId {
        self.owner
    }

    pub fn template(&mut self) -> &mut Template {
        self.template
    }

    pub fn add_scope(&mut self, name: Option<String>) -> ScopeId {
        self.template.add_scope(self.owner, name)
    }

    pub fn expression(&mut self, expression: &Expression) -> Result<Expression, ParseErrorKind> {
        match expression {
            Expression::Constant(constant) => Ok(Expression::Constant(constant.clone())),
            Expression::Variable(variable) => {
                Ok(Expression::Variable(self.variable_expression(variable)?))
            }
        }
    }

    pub fn variable_expression(
        &mut self,
        expression: &VariableExpression,
    ) -> Result<VariableExpression, ParseErrorKind> {
        self.template
            .rebind_variable_expression(expression, self.owner, self.reroot)
    }

    /// Get or add the variable of the same name in the owner scope.
    pub fn variable(&mut self, variable: &VariableRef) -> VariableRef {
        VariableRef {
            name: variable.name.clone(),
            id: self.template.get_or_add_variable(self.owner, &variable.name),
        }
    }
}

pub(crate) fn missing_attribute(tag: &str, attribute: &str) -> ParseErrorKind {
    ParseErrorKind::MissingAttribute {
        tag: tag.to_string(),
        attribute: attribute.to_string(),
    }
}

pub(crate) fn invalid_attribute(tag: &str, attribute: &str, value: &str) -> ParseErrorKind {
    ParseErrorKind::InvalidAttribute {
        tag: tag.to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

/// The implicit container at the root of every template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerTag;

impl TagBehavior for ContainerTag {
    fn tag_name(&self) -> &'static str {
        ""
    }

    fn clone_tag(&self, _cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind> {
        Ok(ContainerTag)
    }
}

#[derive(Debug, Clone)]
pub enum TagKind {
    Container(ContainerTag),
    Template(TemplateTag),
    Variable(VariableTag),
    Property(PropertyTag),
    If(IfTag),
    ForEach(ForEachTag),
    Set(SetTag),
}

macro_rules! dispatch {
    ($kind:expr, $tag:ident => $body:expr) => {
        match $kind {
            TagKind::Container($tag) => $body,
            TagKind::Template($tag) => $body,
            TagKind::Variable($tag) => $body,
            TagKind::Property($tag) => $body,
            TagKind::If($tag) => $body,
            TagKind::ForEach($tag) => $body,
            TagKind::Set($tag) => $body,
        }
    };
}

impl TagKind {
    /// Scope that children of this tag belong to, when the tag opens one.
    pub fn child_scope(&self) -> Option<ScopeId> {
        match self {
            TagKind::Template(tag) => tag.scope,
            _ => None,
        }
    }
}

impl TagBehavior for TagKind {
    fn tag_name(&self) -> &'static str {
        dispatch!(self, tag => tag.tag_name())
    }

    fn is_single(&self) -> bool {
        dispatch!(self, tag => tag.is_single())
    }

    fn on_adding_attribute(
        &mut self,
        cx: &mut BindContext<'_>,
        name: &str,
        value: &str,
    ) -> Result<(), ParseErrorKind> {
        dispatch!(self, tag => tag.on_adding_attribute(cx, name, value))
    }

    fn process_begin_tag(
        &mut self,
        cx: &mut BindContext<'_>,
        closed: bool,
    ) -> Result<bool, ParseErrorKind> {
        dispatch!(self, tag => tag.process_begin_tag(cx, closed))
    }

    fn process_end_tag(&mut self, cx: &mut BindContext<'_>) -> Result<(), ParseErrorKind> {
        dispatch!(self, tag => tag.process_end_tag(cx))
    }

    fn render(&self, node: &Tag, renderer: &mut Renderer<'_>) -> Result<(), RenderError> {
        dispatch!(self, tag => tag.render(node, renderer))
    }

    fn clone_tag(&self, cx: &mut CloneContext<'_>) -> Result<Self, ParseErrorKind> {
        Ok(match self {
            TagKind::Container(tag) => TagKind::Container(tag.clone_tag(cx)?),
            TagKind::Template(tag) => TagKind::Template(tag.clone_tag(cx)?),
            TagKind::Variable(tag) => TagKind::Variable(tag.clone_tag(cx)?),
            TagKind::Property(tag) => TagKind::Property(tag.clone_tag(cx)?),
            TagKind::If(tag) => TagKind::If(tag.clone_tag(cx)?),
            TagKind::ForEach(tag) => TagKind::ForEach(tag.clone_tag(cx)?),
            TagKind::Set(tag) => TagKind::Set(tag.clone_tag(cx)?),
        })
    }
}

pub type TagConstructor = fn() -> TagKind;

/// Maps tag names (without the `vt:` prefix) to constructors.
#[derive(Debug, Clone)]
pub struct TagFactory {
    constructors: IndexMap<String, TagConstructor>,
}

impl Default for TagFactory {
    fn default() -> Self {
        let mut factory = TagFactory::empty();
        factory.register("template", || TagKind::Template(TemplateTag::default()));
        factory.register("property", || TagKind::Property(PropertyTag::default()));
        factory.register("if", || TagKind::If(IfTag::default()));
        factory.register("foreach", || TagKind::ForEach(ForEachTag::default()));
        factory.register("set", || TagKind::Set(SetTag::default()));
        factory
    }
}

impl TagFactory {
    pub fn empty() -> Self {
        TagFactory {
            constructors: IndexMap::new(),
        }
    }

    /// Register `name` (case-insensitive), replacing any earlier constructor.
    pub fn register(&mut self, name: &str, constructor: TagConstructor) {
        self.constructors
            .insert(name.to_ascii_lowercase(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str) -> Option<TagKind> {
        self.constructors
            .get(&name.to_ascii_lowercase())
            .map(|constructor| constructor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_factory_names() {
        let factory = TagFactory::default();
        let names: Vec<_> = factory.names().collect();
        assert_eq!(names, vec!["template", "property", "if", "foreach", "set"]);
        assert!(factory.contains("ForEach"));
        assert!(factory.create("bogus").is_none());
    }

    #[test]
    fn test_register_alias() {
        let mut factory = TagFactory::default();
        factory.register("each", || TagKind::ForEach(ForEachTag::default()));
        let kind = factory.create("EACH").unwrap();
        assert_eq!(kind.tag_name(), "foreach");
    }

    #[test]
    fn test_single_tags() {
        let factory = TagFactory::default();
        assert!(factory.create("set").unwrap().is_single());
        assert!(!factory.create("if").unwrap().is_single());
    }

    #[test]
    fn test_default_begin_tag_respects_closed() {
        let mut template = Template::new();
        let mut cx = BindContext::new(&mut template, ScopeId::ROOT);
        let mut container = ContainerTag;
        assert_eq!(container.process_begin_tag(&mut cx, false), Ok(true));
        assert_eq!(container.process_begin_tag(&mut cx, true), Ok(false));
    }
}
