//! Template Parser
//!
//! Turns template source into a [`Template`]. The scanner in
//! [`patterns`](super::patterns) yields tags and placeholders; everything
//! between them is text. Open tags wait on a stack until their closing tag
//! arrives and are only then moved into the template arena.

use std::borrow::Cow;

use tracing::debug;

use super::entities::decode_entities;
use super::patterns::{AttributeMatch, MatchKind, Patterns, VariableMatch, DEFAULT_PATTERNS};
use crate::chars;
use crate::config::TemplateConfig;
use crate::error::{ParseError, ParseErrorKind};
use crate::tags::{BindContext, ContainerTag, TagBehavior, TagFactory, TagKind, VariableTag};
use crate::template::{Attribute, Node, NodeId, ScopeId, Tag, Template, TextNode};

/// Template parser: configuration, known tags and the compiled scanner.
#[derive(Debug, Clone)]
pub struct Parser {
    config: TemplateConfig,
    factory: TagFactory,
    patterns: Cow<'static, Patterns>,
}

impl Default for Parser {
    fn default() -> Self {
        Parser {
            config: TemplateConfig::default(),
            factory: TagFactory::default(),
            patterns: Cow::Borrowed(&*DEFAULT_PATTERNS),
        }
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TemplateConfig) -> Result<Self, ParseError> {
        let patterns = if config.uses_default_prefix() {
            Cow::Borrowed(&*DEFAULT_PATTERNS)
        } else {
            let compiled = Patterns::new(&config.tag_prefix).map_err(|err| {
                ParseErrorKind::ParseFailure(format!(
                    "invalid tag prefix \"{}\": {}",
                    config.tag_prefix, err
                ))
            })?;
            Cow::Owned(compiled)
        };
        Ok(Parser {
            config,
            factory: TagFactory::default(),
            patterns,
        })
    }

    pub fn with_factory(mut self, factory: TagFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    pub fn factory(&self) -> &TagFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut TagFactory {
        &mut self.factory
    }

    pub fn parse(&self, source: &str) -> Result<Template, ParseError> {
        debug!(
            prefix = %self.config.tag_prefix,
            len = source.len(),
            "parse template"
        );
        let mut builder = TreeBuilder::new(self, source);
        builder.build()?;
        builder.finish()
    }
}

/// A tag whose closing tag has not been consumed yet.
struct OpenTag {
    tag: Tag,
    /// Scope its children are bound in.
    scope: ScopeId,
    /// Source offset of the open tag.
    offset: usize,
}

struct TreeBuilder<'p> {
    parser: &'p Parser,
    source: &'p str,
    template: Template,
    stack: Vec<OpenTag>,
}

impl<'p> TreeBuilder<'p> {
    fn new(parser: &'p Parser, source: &'p str) -> Self {
        TreeBuilder {
            parser,
            source,
            template: Template::new(),
            stack: vec![OpenTag {
                tag: Tag::new(ScopeId::ROOT, "", TagKind::Container(ContainerTag)),
                scope: ScopeId::ROOT,
                offset: 0,
            }],
        }
    }

    fn build(&mut self) -> Result<(), ParseError> {
        let parser = self.parser;
        let source = self.source;
        let mut position = 0;
        for found in parser.patterns.matches(source) {
            if found.offset > position {
                self.consume_text(&source[position..found.offset]);
            }
            let offset = found.offset;
            let result = match found.kind {
                MatchKind::Escape => {
                    self.consume_text(chars::DOLLAR.encode_utf8(&mut [0; 4]));
                    Ok(())
                }
                MatchKind::OpenTag {
                    name,
                    attributes,
                    closed,
                } => self.consume_start_tag(name, attributes, closed, offset),
                MatchKind::CloseTag { name } => self.consume_end_tag(name),
                MatchKind::Variable {
                    variable,
                    attributes,
                } => self.consume_variable(variable, attributes, offset),
            };
            result.map_err(|kind| ParseError::at(kind, source, offset))?;
            position = found.offset + found.text.len();
        }
        if position < source.len() {
            self.consume_text(&source[position..]);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Template, ParseError> {
        if self.stack.len() > 1 {
            if let Some(open) = self.stack.pop() {
                return Err(ParseError::at(
                    ParseErrorKind::UnclosedTag(open.tag.name),
                    self.source,
                    open.offset,
                ));
            }
        }
        if let Some(root) = self.stack.pop() {
            self.template.set_children(NodeId::ROOT, root.tag.children);
        }
        Ok(self.template)
    }

    fn current_scope(&self) -> ScopeId {
        self.stack.last().map_or(ScopeId::ROOT, |open| open.scope)
    }

    fn consume_text(&mut self, text: &str) {
        let last = self
            .stack
            .last()
            .and_then(|open| open.tag.children.last().copied());
        if let Some(node) = last.and_then(|id| self.template.text_node_mut(id)) {
            node.text.push_str(text);
            return;
        }
        let owner = self.current_scope();
        let id = self
            .template
            .alloc_node(Node::Text(TextNode::new(owner, text)));
        self.push_child(id);
    }

    fn consume_variable(
        &mut self,
        variable: VariableMatch,
        attributes: Vec<AttributeMatch>,
        offset: usize,
    ) -> Result<(), ParseErrorKind> {
        let owner = self.current_scope();
        let expression = self.template.bind_variable(owner, &variable)?;
        let kind = TagKind::Variable(VariableTag::new(expression));
        let name = kind.tag_name().to_string();
        self.open_tag(name, kind, attributes, true, offset)
    }

    fn consume_start_tag(
        &mut self,
        name: String,
        attributes: Vec<AttributeMatch>,
        closed: bool,
        offset: usize,
    ) -> Result<(), ParseErrorKind> {
        let kind = self
            .parser
            .factory
            .create(&name)
            .ok_or_else(|| ParseErrorKind::UnknownTag(name.clone()))?;
        if let Some(max_depth) = self.parser.config.max_depth {
            // The root container sits at level 0, so a new tag lands at stack.len().
            if self.stack.len() > max_depth {
                return Err(ParseErrorKind::ParseFailure(format!(
                    "tag \"{}\" exceeds the maximum nesting depth of {}",
                    name, max_depth
                )));
            }
        }
        self.open_tag(name, kind, attributes, closed, offset)
    }

    fn open_tag(
        &mut self,
        name: String,
        mut kind: TagKind,
        attributes: Vec<AttributeMatch>,
        closed: bool,
        offset: usize,
    ) -> Result<(), ParseErrorKind> {
        let owner = self.current_scope();
        let decode = self.parser.config.decode_entities;
        let mut bound = Vec::with_capacity(attributes.len());
        let mut cx = BindContext::new(&mut self.template, owner);
        for attr in attributes {
            let value = if decode {
                decode_entities(&attr.value).into_owned()
            } else {
                attr.value
            };
            kind.on_adding_attribute(&mut cx, &attr.name, &value)?;
            bound.push(Attribute {
                name: attr.name,
                value,
            });
        }
        let stays_open = kind.process_begin_tag(&mut cx, closed)?;

        let scope = kind.child_scope().unwrap_or(owner);
        let mut tag = Tag::new(owner, name, kind);
        tag.attributes = bound;
        if stays_open {
            debug!(tag = %tag.name, offset, depth = self.stack.len(), "open tag");
            self.stack.push(OpenTag { tag, scope, offset });
        } else {
            self.add_to_parent(tag);
        }
        Ok(())
    }

    fn consume_end_tag(&mut self, name: String) -> Result<(), ParseErrorKind> {
        let expected = match self.stack.last() {
            Some(open) if self.stack.len() > 1 => open.tag.name.clone(),
            _ => {
                return Err(ParseErrorKind::UnmatchedTag {
                    expected: None,
                    found: name,
                })
            }
        };
        if expected != name {
            return Err(ParseErrorKind::UnmatchedTag {
                expected: Some(expected),
                found: name,
            });
        }
        if let Some(mut open) = self.stack.pop() {
            let mut cx = BindContext::new(&mut self.template, open.tag.owner);
            open.tag.kind.process_end_tag(&mut cx)?;
            debug!(tag = %open.tag.name, children = open.tag.children.len(), "close tag");
            self.add_to_parent(open.tag);
        }
        Ok(())
    }

    fn add_to_parent(&mut self, tag: Tag) {
        let child_scope = tag.kind.child_scope();
        let id = self.template.alloc_node(Node::Tag(tag));
        if let Some(scope) = child_scope {
            self.template.attach_scope(scope, id);
        }
        self.push_child(id);
    }

    fn push_child(&mut self, id: NodeId) {
        if let Some(open) = self.stack.last_mut() {
            open.tag.children.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Template, ParseError> {
        Parser::new().parse(source)
    }

    #[test]
    fn test_plain_text_is_one_node() {
        let template = parse("Hello, world").unwrap();
        assert_eq!(template.root_nodes().len(), 1);
        let node = template.node(template.root_nodes()[0]).unwrap();
        assert_eq!(node.as_text().map(|t| t.text.as_str()), Some("Hello, world"));
    }

    #[test]
    fn test_escape_merges_into_text() {
        let template = parse("cost: $$5").unwrap();
        assert_eq!(template.root_nodes().len(), 1);
        let node = template.node(template.root_nodes()[0]).unwrap();
        assert_eq!(node.as_text().map(|t| t.text.as_str()), Some("cost: $5"));
    }

    #[test]
    fn test_variable_becomes_single_tag() {
        let template = parse("Hi $user.name!").unwrap();
        let kinds: Vec<_> = template
            .root_nodes()
            .iter()
            .map(|&id| match template.node(id).unwrap() {
                Node::Text(_) => "text",
                Node::Tag(tag) => tag.kind.tag_name(),
            })
            .collect();
        assert_eq!(kinds, vec!["text", "variable", "text"]);
        assert_eq!(template.variable_names(ScopeId::ROOT), vec!["user"]);
    }

    #[test]
    fn test_template_children_bind_in_nested_scope() {
        let template = parse(r#"<vt:template name="row">$cell</vt:template>"#).unwrap();
        let row = template.scope_by_name("row").unwrap();
        assert_eq!(template.variable_names(row), vec!["cell"]);
        assert!(template.variable_names(ScopeId::ROOT).is_empty());
        assert_eq!(template.elements(row).len(), 1);
    }

    #[test]
    fn test_unclosed_tag_reports_open_offset() {
        let err = parse("ab\n  <vt:if var=\"$x\">text").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedTag("if".to_string()));
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.column(), Some(3));
    }

    #[test]
    fn test_close_without_open() {
        let err = parse("x</vt:if>").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnmatchedTag {
                expected: None,
                found: "if".to_string()
            }
        );
    }

    #[test]
    fn test_mismatched_close() {
        let err = parse(r#"<vt:template><vt:if var="$x"></vt:template>"#).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnmatchedTag {
                expected: Some("if".to_string()),
                found: "template".to_string()
            }
        );
    }

    #[test]
    fn test_max_depth() {
        let parser = Parser::with_config(TemplateConfig::default().with_max_depth(1)).unwrap();
        assert!(parser.parse(r#"<vt:template>$x</vt:template>"#).is_ok());
        let err = parser
            .parse(r#"<vt:template><vt:template></vt:template></vt:template>"#)
            .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ParseFailure(_)));
    }

    #[test]
    fn test_custom_prefix() {
        let parser = Parser::with_config(TemplateConfig::default().with_tag_prefix("tpl")).unwrap();
        let template = parser
            .parse(r#"<tpl:set var="a" value="b"/><vt:set var="c" value="d"/>"#)
            .unwrap();
        assert_eq!(template.root_nodes().len(), 2);
        assert_eq!(template.variable_names(ScopeId::ROOT), vec!["a"]);
    }

    #[test]
    fn test_attribute_entities() {
        let template = parse(r#"<vt:set var="a" value="x &amp; y"/>"#).unwrap();
        let tag = template
            .node(template.root_nodes()[0])
            .and_then(Node::as_tag)
            .unwrap();
        assert_eq!(tag.attribute("value"), Some("x & y"));

        let mut config = TemplateConfig::default();
        config.decode_entities = false;
        let template = Parser::with_config(config)
            .unwrap()
            .parse(r#"<vt:set var="a" value="x &amp; y"/>"#)
            .unwrap();
        let tag = template
            .node(template.root_nodes()[0])
            .and_then(Node::as_tag)
            .unwrap();
        assert_eq!(tag.attribute("value"), Some("x &amp; y"));
    }
}
