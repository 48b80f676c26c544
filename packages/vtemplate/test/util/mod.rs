/*
 * Test Utilities
 *
 * Shared helpers for the integration tests: a clock host object, parse and
 * render shortcuts, and a flat description of a parsed tree.
 */

#![allow(dead_code)]

use vtemplate::tags::TagBehavior;
use vtemplate::{HostObject, Node, NodeId, Template, Value};

/// Host object with a `Now` property and a `tick()` method.
#[derive(Debug)]
pub struct Clock {
    pub now: String,
}

impl Clock {
    pub fn at(now: &str) -> Self {
        Clock {
            now: now.to_string(),
        }
    }
}

impl HostObject for Clock {
    fn type_name(&self) -> &str {
        "Clock"
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        match name {
            "Now" => Some(Value::from(self.now.as_str())),
            _ => None,
        }
    }

    fn call_method(&self, name: &str) -> Option<Value> {
        match name {
            "tick" => Some(Value::from(1)),
            _ => None,
        }
    }
}

pub fn parse(source: &str) -> Template {
    vtemplate::parse(source).unwrap_or_else(|err| panic!("failed to parse {:?}: {}", source, err))
}

pub fn render(template: &mut Template) -> String {
    template
        .render_to_string()
        .unwrap_or_else(|err| panic!("failed to render: {}", err))
}

/// Parse `source`, assign root variables and render.
pub fn render_with(source: &str, variables: Vec<(&str, Value)>) -> String {
    let mut template = parse(source);
    for (name, value) in variables {
        template.set_variable(name, value);
    }
    render(&mut template)
}

/// One line per node in document order: `text:<text>` or `<depth>:<tag name>`.
pub fn humanize(template: &Template) -> Vec<String> {
    let mut out = Vec::new();
    for &id in template.root_nodes() {
        humanize_node(template, id, 0, &mut out);
    }
    out
}

fn humanize_node(template: &Template, id: NodeId, depth: usize, out: &mut Vec<String>) {
    match template.node(id) {
        Some(Node::Text(text)) => out.push(format!("text:{}", text.text)),
        Some(Node::Tag(tag)) => {
            out.push(format!("{}:{}", depth, tag.kind.tag_name()));
            for &child in &tag.children {
                humanize_node(template, child, depth + 1, out);
            }
        }
        None => out.push(format!("missing:{}", id.index())),
    }
}
