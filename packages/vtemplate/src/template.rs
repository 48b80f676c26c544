//! Templates, scopes and variables.
//!
//! A [`Template`] is an arena holding every scope, variable and element of
//! one parsed document. Handles ([`ScopeId`], [`NodeId`], [`VariableId`])
//! index into that arena, so copying the arena copies the whole tree and
//! every handle stays valid in the copy.
//!
//! Variable values live apart from the tree in a [`VariableStore`]: the tree
//! is built once while parsing, values change on every render.

use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::chars;
use crate::error::{ParseErrorKind, RenderError};
use crate::expression::{Expression, ScopePrefix, VariableExpression};
use crate::ml_parser::patterns::{self, VariableMatch};
use crate::reflect::TypeRegistry;
use crate::render::Renderer;
use crate::tags::{CloneContext, ContainerTag, TagBehavior, TagKind};
use crate::value::Value;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Implicit container holding the top-level elements of the root scope.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(usize);

impl VariableId {
    pub fn new(index: usize) -> Self {
        VariableId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A named slot, registered in exactly one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub owner: ScopeId,
}

/// A variable bound by name in the scope of the tag that declared it, as in
/// `<vt:foreach item="row">`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    pub name: String,
    pub id: VariableId,
}

/// A variable namespace: the root document or a nested `<vt:template>`.
#[derive(Debug, Clone)]
pub struct Scope {
    name: Option<String>,
    parent: Option<ScopeId>,
    container: NodeId,
    variables: IndexMap<String, VariableId>,
}

impl Scope {
    fn new(name: Option<String>, parent: Option<ScopeId>) -> Self {
        Scope {
            name,
            parent,
            container: NodeId::ROOT,
            variables: IndexMap::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Tag whose children are this scope's top-level elements.
    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn variable(&self, name: &str) -> Option<VariableId> {
        self.variables.get(name).copied()
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub owner: ScopeId,
    pub text: String,
}

impl TextNode {
    pub fn new(owner: ScopeId, text: impl Into<String>) -> Self {
        TextNode {
            owner,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tag {
    pub owner: ScopeId,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeId>,
    pub kind: TagKind,
}

impl Tag {
    pub fn new(owner: ScopeId, name: impl Into<String>, kind: TagKind) -> Self {
        Tag {
            owner,
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            kind,
        }
    }

    /// Last value written for `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn is_single(&self) -> bool {
        self.kind.is_single()
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Text(TextNode),
    Tag(Tag),
}

impl Node {
    pub fn owner(&self) -> ScopeId {
        match self {
            Node::Text(text) => text.owner,
            Node::Tag(tag) => tag.owner,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Node::Tag(tag) => Some(tag),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(text) => Some(text),
            Node::Tag(_) => None,
        }
    }
}

/// Current values of a template's variables, indexed by [`VariableId`].
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: Vec<Value>,
}

impl VariableStore {
    pub fn value(&self, id: VariableId) -> &Value {
        self.values.get(id.0).unwrap_or(&NULL)
    }

    pub fn set(&mut self, id: VariableId, value: Value) {
        if let Some(slot) = self.values.get_mut(id.0) {
            *slot = value;
        }
    }

    pub fn push(&mut self, value: Value) -> VariableId {
        self.values.push(value);
        VariableId(self.values.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Arena sizes to roll a failed clone back to.
struct Checkpoint {
    scopes: usize,
    variables: usize,
    nodes: usize,
}

/// A parsed template document.
///
/// `Clone` produces a fully independent copy: tree, scopes and variable
/// values. Host objects inside values are shared by reference.
#[derive(Debug, Clone)]
pub struct Template {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
    nodes: Vec<Node>,
    store: VariableStore,
    types: TypeRegistry,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// An empty template with only the root scope.
    pub fn new() -> Self {
        Template {
            scopes: vec![Scope::new(None, None)],
            variables: Vec::new(),
            nodes: vec![Node::Tag(Tag::new(
                ScopeId::ROOT,
                "",
                TagKind::Container(ContainerTag),
            ))],
            store: VariableStore::default(),
            types: TypeRegistry::default(),
        }
    }

    // ---------------------------------------------------------------------
    // Tree queries
    // ---------------------------------------------------------------------

    pub fn root(&self) -> ScopeId {
        ScopeId::ROOT
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(index, scope)| (ScopeId(index), scope))
    }

    /// First scope, in document order, called `name`.
    pub fn scope_by_name(&self, name: &str) -> Option<ScopeId> {
        self.scopes()
            .find(|(_, scope)| scope.name() == Some(name))
            .map(|(id, _)| id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn root_nodes(&self) -> &[NodeId] {
        self.elements(ScopeId::ROOT)
    }

    /// Top-level elements of a scope.
    pub fn elements(&self, scope: ScopeId) -> &[NodeId] {
        self.scopes
            .get(scope.0)
            .and_then(|scope| self.nodes.get(scope.container.0))
            .and_then(Node::as_tag)
            .map_or(&[], |tag| tag.children.as_slice())
    }

    pub fn variable_info(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn variable_names(&self, scope: ScopeId) -> Vec<&str> {
        self.scopes
            .get(scope.0)
            .map(|scope| scope.variable_names().collect())
            .unwrap_or_default()
    }

    /// Deepest nesting of tags below the root container.
    pub fn tag_depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(NodeId::ROOT, 0)];
        while let Some((id, depth)) = pending.pop() {
            if let Some(Node::Tag(tag)) = self.nodes.get(id.0) {
                deepest = deepest.max(depth);
                pending.extend(tag.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        deepest
    }

    // ---------------------------------------------------------------------
    // Binding: structure only, no values
    // ---------------------------------------------------------------------

    pub fn add_scope(&mut self, parent: ScopeId, name: Option<String>) -> ScopeId {
        self.scopes.push(Scope::new(name, Some(parent)));
        let id = ScopeId(self.scopes.len() - 1);
        debug!(scope = id.0, parent = parent.0, name = ?self.scopes[id.0].name, "add scope");
        id
    }

    pub(crate) fn attach_scope(&mut self, scope: ScopeId, container: NodeId) {
        if let Some(scope) = self.scopes.get_mut(scope.0) {
            scope.container = container;
        }
    }

    pub(crate) fn alloc_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn text_node_mut(&mut self, id: NodeId) -> Option<&mut TextNode> {
        match self.nodes.get_mut(id.0) {
            Some(Node::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn set_children(&mut self, container: NodeId, children: Vec<NodeId>) {
        if let Some(Node::Tag(tag)) = self.nodes.get_mut(container.0) {
            tag.children = children;
        }
    }

    fn push_child(&mut self, container: NodeId, child: NodeId) {
        if let Some(Node::Tag(tag)) = self.nodes.get_mut(container.0) {
            tag.children.push(child);
        }
    }

    /// Existing variable `name` of `scope`, or a new null one.
    pub fn get_or_add_variable(&mut self, scope: ScopeId, name: &str) -> VariableId {
        if let Some(id) = self.scopes[scope.0].variable(name) {
            return id;
        }
        let id = self.store.push(Value::Null);
        self.variables.push(Variable {
            name: name.to_string(),
            owner: scope,
        });
        self.scopes[scope.0].variables.insert(name.to_string(), id);
        trace!(scope = scope.0, variable = name, "register variable");
        id
    }

    /// Scope selected by `prefix` as seen from `owner`.
    pub fn resolve_prefix(&self, owner: ScopeId, prefix: Option<&ScopePrefix>) -> Option<ScopeId> {
        match prefix {
            None => Some(owner),
            Some(ScopePrefix::Ancestor(depth)) => {
                let mut current = owner;
                for _ in 0..*depth {
                    current = self.scopes[current.0].parent?;
                }
                Some(current)
            }
            Some(ScopePrefix::Named(name)) => {
                let mut current = Some(owner);
                while let Some(id) = current {
                    let scope = &self.scopes[id.0];
                    if scope.name() == Some(name.as_str()) {
                        return Some(id);
                    }
                    current = scope.parent;
                }
                None
            }
        }
    }

    pub fn bind_variable(
        &mut self,
        owner: ScopeId,
        variable: &VariableMatch,
    ) -> Result<VariableExpression, ParseErrorKind> {
        let scope = self
            .resolve_prefix(owner, variable.prefix.as_ref())
            .ok_or_else(|| {
                ParseErrorKind::UnknownTemplateReference(
                    variable
                        .prefix
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                )
            })?;
        Ok(VariableExpression {
            prefix: variable.prefix.clone(),
            name: variable.name.clone(),
            variable: self.get_or_add_variable(scope, &variable.name),
            accessors: variable.accessors.clone(),
        })
    }

    /// Build an expression from attribute text.
    ///
    /// `$name...` is a variable reference, `$$text` is the constant `$text`,
    /// anything else (including a `$` not followed by a valid reference) is
    /// constant text without the leading `$`.
    pub fn create_expression(
        &mut self,
        owner: ScopeId,
        text: &str,
    ) -> Result<Expression, ParseErrorKind> {
        let Some(rest) = text.strip_prefix(chars::DOLLAR) else {
            return Ok(Expression::constant(text));
        };
        if rest.starts_with(chars::DOLLAR) {
            return Ok(Expression::constant(rest));
        }
        match patterns::parse_variable(rest) {
            Some(variable) => Ok(Expression::Variable(self.bind_variable(owner, &variable)?)),
            None => Ok(Expression::constant(rest)),
        }
    }

    // ---------------------------------------------------------------------
    // Cloning
    // ---------------------------------------------------------------------

    /// Re-bind a variable expression by name in the scope its prefix selects
    /// from `owner`. When the prefix does not resolve, the variable is bound
    /// in `reroot` if one is given, else the prefix is reported.
    pub(crate) fn rebind_variable_expression(
        &mut self,
        expression: &VariableExpression,
        owner: ScopeId,
        reroot: Option<ScopeId>,
    ) -> Result<VariableExpression, ParseErrorKind> {
        let scope = self
            .resolve_prefix(owner, expression.prefix.as_ref())
            .or(reroot)
            .ok_or_else(|| {
                ParseErrorKind::UnknownTemplateReference(
                    expression
                        .prefix
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                )
            })?;
        Ok(VariableExpression {
            prefix: expression.prefix.clone(),
            name: expression.name.clone(),
            variable: self.get_or_add_variable(scope, &expression.name),
            accessors: expression.accessors.clone(),
        })
    }

    /// Copy the subtree at `node` to the end of `scope`'s elements. Every
    /// variable reference in the copy is re-bound by name against `scope`;
    /// nested templates in the subtree get fresh scopes of their own.
    ///
    /// A scope prefix that selects nothing from the new position fails with
    /// `UnknownTemplateReference` and leaves the template unchanged.
    pub fn clone_node_into(
        &mut self,
        node: NodeId,
        scope: ScopeId,
    ) -> Result<NodeId, ParseErrorKind> {
        let checkpoint = self.checkpoint();
        let copy = match self.clone_node_from(None, node, scope, None) {
            Ok(copy) => copy,
            Err(err) => {
                self.rollback(checkpoint);
                return Err(err);
            }
        };
        let container = self.scopes[scope.0].container;
        self.push_child(container, copy);
        debug!(node = node.0, scope = scope.0, copy = copy.0, "clone node");
        Ok(copy)
    }

    /// A standalone template whose root holds a copy of `scope`'s elements.
    /// The copy starts with null variables and shares registered types.
    /// The new root takes the copied scope's name; references to scopes
    /// outside the copied one are re-rooted into the new root.
    pub fn clone_scope(&self, scope: ScopeId) -> Result<Template, ParseErrorKind> {
        let mut out = Template::new();
        out.types = self.types.clone();
        out.scopes[0].name = self.scopes[scope.0].name.clone();
        let children = self
            .elements(scope)
            .iter()
            .map(|&child| {
                out.clone_node_from(Some(self), child, ScopeId::ROOT, Some(ScopeId::ROOT))
            })
            .collect::<Result<Vec<_>, _>>()?;
        out.set_children(NodeId::ROOT, children);
        debug!(scope = scope.0, nodes = out.nodes.len(), "clone scope");
        Ok(out)
    }

    /// Copy one node, reading from `source` or, when `None`, from `self`.
    fn clone_node_from(
        &mut self,
        source: Option<&Template>,
        id: NodeId,
        owner: ScopeId,
        reroot: Option<ScopeId>,
    ) -> Result<NodeId, ParseErrorKind> {
        let node = match source {
            Some(src) => src.nodes[id.0].clone(),
            None => self.nodes[id.0].clone(),
        };
        match node {
            Node::Text(text) => Ok(self.alloc_node(Node::Text(TextNode::new(owner, text.text)))),
            Node::Tag(tag) => {
                let kind = tag.kind.clone_tag(&mut CloneContext::new(self, owner, reroot))?;
                let child_scope = kind.child_scope();
                let child_owner = child_scope.unwrap_or(owner);
                let children = tag
                    .children
                    .iter()
                    .map(|&child| self.clone_node_from(source, child, child_owner, reroot))
                    .collect::<Result<Vec<_>, _>>()?;
                let copy = self.alloc_node(Node::Tag(Tag {
                    owner,
                    name: tag.name,
                    attributes: tag.attributes,
                    children,
                    kind,
                }));
                if let Some(scope) = child_scope {
                    self.attach_scope(scope, copy);
                }
                Ok(copy)
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            scopes: self.scopes.len(),
            variables: self.variables.len(),
            nodes: self.nodes.len(),
        }
    }

    /// Drop every scope, variable and node added since `checkpoint`.
    fn rollback(&mut self, checkpoint: Checkpoint) {
        for variable in self.variables.drain(checkpoint.variables..) {
            if let Some(scope) = self.scopes.get_mut(variable.owner.0) {
                scope.variables.shift_remove(&variable.name);
            }
        }
        self.store.truncate(checkpoint.variables);
        self.scopes.truncate(checkpoint.scopes);
        self.nodes.truncate(checkpoint.nodes);
    }

    // ---------------------------------------------------------------------
    // Evaluation: values and output
    // ---------------------------------------------------------------------

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn register_type<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.types.register(name, constructor);
    }

    /// Assign a root-scope variable, registering it if needed.
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.set_scope_variable(ScopeId::ROOT, name, value);
    }

    pub fn set_scope_variable(&mut self, scope: ScopeId, name: &str, value: impl Into<Value>) {
        let id = self.get_or_add_variable(scope, name);
        self.store.set(id, value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.scope_variable(ScopeId::ROOT, name)
    }

    pub fn scope_variable(&self, scope: ScopeId, name: &str) -> Option<&Value> {
        let id = self.scopes.get(scope.0)?.variable(name)?;
        Some(self.store.value(id))
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn render<W: fmt::Write>(&mut self, out: &mut W) -> Result<(), RenderError> {
        self.render_scope(ScopeId::ROOT, out)
    }

    /// Render only the elements of one scope.
    pub fn render_scope<W: fmt::Write>(
        &mut self,
        scope: ScopeId,
        out: &mut W,
    ) -> Result<(), RenderError> {
        let container = self.scopes.get(scope.0).map_or(NodeId::ROOT, |s| s.container);
        let mut renderer = Renderer::new(&self.nodes, &mut self.store, &self.types, out);
        renderer.render_node(container)
    }

    pub fn render_to_string(&mut self) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render(&mut out)?;
        Ok(out)
    }
}
