//! Depth-first rendering of a bound element tree.

use std::fmt;

use tracing::trace;

use crate::error::RenderError;
use crate::reflect::TypeRegistry;
use crate::tags::TagBehavior;
use crate::template::{Node, NodeId, VariableStore};

/// Walks a template's nodes, writing text and letting tags drive their
/// children. Tags read and assign variables through [`Renderer::store`] and
/// [`Renderer::store_mut`].
pub struct Renderer<'a> {
    nodes: &'a [Node],
    store: &'a mut VariableStore,
    types: &'a TypeRegistry,
    out: &'a mut dyn fmt::Write,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(
        nodes: &'a [Node],
        store: &'a mut VariableStore,
        types: &'a TypeRegistry,
        out: &'a mut dyn fmt::Write,
    ) -> Self {
        Renderer {
            nodes,
            store,
            types,
            out,
        }
    }

    pub fn store(&self) -> &VariableStore {
        self.store
    }

    pub fn store_mut(&mut self) -> &mut VariableStore {
        self.store
    }

    pub fn types(&self) -> &TypeRegistry {
        self.types
    }

    pub fn write_str(&mut self, text: &str) -> Result<(), RenderError> {
        self.out.write_str(text)?;
        Ok(())
    }

    pub fn render_children(&mut self, children: &[NodeId]) -> Result<(), RenderError> {
        for &child in children {
            self.render_node(child)?;
        }
        Ok(())
    }

    pub fn render_node(&mut self, id: NodeId) -> Result<(), RenderError> {
        let nodes = self.nodes;
        match &nodes[id.index()] {
            Node::Text(text) => self.write_str(&text.text),
            Node::Tag(tag) => {
                trace!(tag = %tag.name, node = id.index(), "render tag");
                tag.kind.render(tag, self)
            }
        }
    }
}
