//! Template Patterns
//!
//! Regex-driven scanner that finds markup inside template text:
//! `<vt:name attr="v">`, `<vt:name/>`, `</vt:name>`, `$var.field.method()`,
//! `{$var attr="v"}` and the `$$` escape. Everything between two matches is
//! literal text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::DEFAULT_TAG_PREFIX;
use crate::expression::{Accessor, AccessorChain, ScopePrefix};

/// Attribute list following a tag name.
const ATTRIBUTE_LIST: &str = r#"(?:\s+[\w:-]+\s*=\s*(?:"[^"]*"|'[^']*'))*"#;

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?P<attrname>[\w:-]+)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#).unwrap()
});

static ACCESSOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(?P<field>[A-Za-z_]\w*)(?P<method>\(\))?").unwrap());

static VARIABLE_EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{}$", variable_pattern(&EXPRESSION_GROUPS))).unwrap()
});

/// Patterns for the default `vt` tag prefix.
pub static DEFAULT_PATTERNS: Lazy<Patterns> =
    Lazy::new(|| Patterns::new(DEFAULT_TAG_PREFIX).unwrap());

/// Capture group names of one instance of the variable grammar. The scanner
/// embeds the grammar twice, and group names must be unique per regex.
struct VariableGroups {
    named: &'static str,
    hashes: &'static str,
    name: &'static str,
    chain: &'static str,
}

const EXPRESSION_GROUPS: VariableGroups = VariableGroups {
    named: "named",
    hashes: "hashes",
    name: "name",
    chain: "chain",
};

const BRACED_GROUPS: VariableGroups = VariableGroups {
    named: "bnamed",
    hashes: "bhashes",
    name: "bname",
    chain: "bchain",
};

const PLAIN_GROUPS: VariableGroups = VariableGroups {
    named: "vnamed",
    hashes: "vhashes",
    name: "vname",
    chain: "vchain",
};

fn variable_pattern(groups: &VariableGroups) -> String {
    format!(
        r"(?:#(?P<{}>[A-Za-z_][\w-]*)\.|(?P<{}>#+)\.)?(?P<{}>[A-Za-z_]\w*)(?P<{}>(?:\.[A-Za-z_]\w*(?:\(\))?)*)",
        groups.named, groups.hashes, groups.name, groups.chain
    )
}

/// Attribute as written in the source, before entity decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub value: String,
}

/// A variable reference: optional scope prefix, name and accessor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableMatch {
    pub prefix: Option<ScopePrefix>,
    pub name: String,
    pub accessors: AccessorChain,
}

impl VariableMatch {
    fn from_captures(caps: &Captures<'_>, groups: &VariableGroups) -> Option<Self> {
        let prefix = if let Some(named) = caps.name(groups.named) {
            Some(ScopePrefix::Named(named.as_str().to_string()))
        } else {
            caps.name(groups.hashes)
                .map(|hashes| ScopePrefix::Ancestor(hashes.as_str().len()))
        };
        let name = caps.name(groups.name)?.as_str().to_string();
        let accessors = caps
            .name(groups.chain)
            .map(|chain| parse_accessors(chain.as_str()))
            .unwrap_or_default();
        Some(VariableMatch {
            prefix,
            name,
            accessors,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKind {
    /// `$$`, a literal dollar sign.
    Escape,
    OpenTag {
        name: String,
        attributes: Vec<AttributeMatch>,
        closed: bool,
    },
    CloseTag {
        name: String,
    },
    Variable {
        variable: VariableMatch,
        attributes: Vec<AttributeMatch>,
    },
}

/// One structural match and where it sits in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch<'t> {
    pub offset: usize,
    pub text: &'t str,
    pub kind: MatchKind,
}

impl TemplateMatch<'_> {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Compiled scanner for one tag prefix.
#[derive(Debug, Clone)]
pub struct Patterns {
    scanner: Regex,
}

impl Patterns {
    pub fn new(tag_prefix: &str) -> Result<Self, regex::Error> {
        let tag = regex::escape(tag_prefix);
        let pattern = [
            r"(?P<escape>\$\$)".to_string(),
            format!(r"</{}:(?P<endtag>[\w-]+)\s*>", tag),
            format!(
                r"<{}:(?P<tagname>[\w-]+)(?P<attrs>{})\s*(?P<closed>/)?>",
                tag, ATTRIBUTE_LIST
            ),
            format!(
                r"\{{\$(?P<bvar>{})(?P<battrs>{})\s*\}}",
                variable_pattern(&BRACED_GROUPS),
                ATTRIBUTE_LIST
            ),
            format!(r"\$(?P<var>{})", variable_pattern(&PLAIN_GROUPS)),
        ]
        .join("|");
        Ok(Patterns {
            scanner: Regex::new(&pattern)?,
        })
    }

    /// Lazily scan the whole of `text`.
    pub fn matches<'p, 't>(&'p self, text: &'t str) -> Matches<'p, 't> {
        Matches {
            patterns: self,
            text,
            position: 0,
        }
    }

    /// First match starting at or after `start`.
    pub fn next_match<'t>(&self, text: &'t str, start: usize) -> Option<TemplateMatch<'t>> {
        let mut position = start;
        while position <= text.len() {
            let caps = self.scanner.captures_at(text, position)?;
            let whole = caps.get(0)?;
            if let Some(kind) = match_kind(&caps) {
                return Some(TemplateMatch {
                    offset: whole.start(),
                    text: whole.as_str(),
                    kind,
                });
            }
            position = next_char_boundary(text, whole.start());
        }
        None
    }
}

/// Iterator over the matches of one template source.
pub struct Matches<'p, 't> {
    patterns: &'p Patterns,
    text: &'t str,
    position: usize,
}

impl<'t> Iterator for Matches<'_, 't> {
    type Item = TemplateMatch<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let found = self.patterns.next_match(self.text, self.position)?;
        self.position = found.end().max(next_char_boundary(self.text, found.offset));
        Some(found)
    }
}

fn next_char_boundary(text: &str, offset: usize) -> usize {
    text[offset..]
        .chars()
        .next()
        .map_or(text.len() + 1, |ch| offset + ch.len_utf8())
}

fn match_kind(caps: &Captures<'_>) -> Option<MatchKind> {
    if caps.name("escape").is_some() {
        return Some(MatchKind::Escape);
    }
    if let Some(name) = caps.name("endtag") {
        return Some(MatchKind::CloseTag {
            name: name.as_str().to_ascii_lowercase(),
        });
    }
    if let Some(name) = caps.name("tagname") {
        return Some(MatchKind::OpenTag {
            name: name.as_str().to_ascii_lowercase(),
            attributes: parse_attributes(caps.name("attrs").map_or("", |m| m.as_str())),
            closed: caps.name("closed").is_some(),
        });
    }
    if caps.name("bvar").is_some() {
        return Some(MatchKind::Variable {
            variable: VariableMatch::from_captures(caps, &BRACED_GROUPS)?,
            attributes: parse_attributes(caps.name("battrs").map_or("", |m| m.as_str())),
        });
    }
    if caps.name("var").is_some() {
        return Some(MatchKind::Variable {
            variable: VariableMatch::from_captures(caps, &PLAIN_GROUPS)?,
            attributes: Vec::new(),
        });
    }
    None
}

/// Split an attribute list into name/value pairs, in source order.
/// Names are lower-cased; values are returned undecoded.
pub fn parse_attributes(text: &str) -> Vec<AttributeMatch> {
    ATTRIBUTE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.name("attrname")?.as_str().to_ascii_lowercase();
            let value = caps
                .name("dq")
                .or_else(|| caps.name("sq"))
                .map_or("", |m| m.as_str())
                .to_string();
            Some(AttributeMatch { name, value })
        })
        .collect()
}

/// Parse a whole string as a variable reference, without the leading `$`.
pub fn parse_variable(text: &str) -> Option<VariableMatch> {
    let caps = VARIABLE_EXPRESSION_RE.captures(text)?;
    VariableMatch::from_captures(&caps, &EXPRESSION_GROUPS)
}

fn parse_accessors(chain: &str) -> AccessorChain {
    ACCESSOR_RE
        .captures_iter(chain)
        .filter_map(|caps| {
            let name = caps.name("field")?.as_str().to_string();
            Some(Accessor {
                name,
                is_method: caps.name("method").is_some(),
            })
        })
        .collect()
}
