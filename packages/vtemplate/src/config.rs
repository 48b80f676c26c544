//! Parser Configuration

use serde::{Deserialize, Serialize};

/// Namespace that marks engine tags, as in `<vt:foreach>`.
pub const DEFAULT_TAG_PREFIX: &str = "vt";

/// Nesting limit applied unless a config lifts it. Rendering walks the tree
/// recursively, so unbounded nesting can exhaust the stack.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Options controlling how template source is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Prefix before the colon in tag names.
    pub tag_prefix: String,
    /// Decode HTML entities in attribute values before binding them.
    pub decode_entities: bool,
    /// Deepest allowed tag nesting. `None` (JSON `null`) means unlimited.
    pub max_depth: Option<usize>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        TemplateConfig {
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            decode_entities: true,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl TemplateConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = prefix.into();
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn uses_default_prefix(&self) -> bool {
        self.tag_prefix == DEFAULT_TAG_PREFIX
    }
}
