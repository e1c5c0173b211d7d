//! Selector - A small structural selector for surface queries.
//!
//! Supports `tag`, `#id`, `.class`, `*` and compounds of those
//! (`li.item.active`), plus comma-separated alternatives. Combinators are not
//! supported; a selector containing whitespace inside a compound never matches.

use crate::tree::DomMatcher;

use super::DomNode;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    invalid: bool,
}

impl Compound {
    fn parse(text: &str) -> Self {
        let mut compound = Compound::default();
        if text.is_empty() || text.contains(char::is_whitespace) {
            compound.invalid = true;
            return compound;
        }
        let mut rest = text;
        // Leading tag or universal selector.
        let tag_end = rest.find(['#', '.']).unwrap_or(rest.len());
        match &rest[..tag_end] {
            "" | "*" => {}
            tag => compound.tag = Some(tag.to_ascii_lowercase()),
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                compound.invalid = true;
                break;
            }
            match marker {
                '#' => compound.id = Some(name.to_string()),
                _ => compound.classes.push(name.to_string()),
            }
            rest = &body[end..];
        }
        compound
    }

    fn matches(&self, node: &DomNode) -> bool {
        if self.invalid {
            return false;
        }
        let Some(tag) = node.tag() else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| !t.eq_ignore_ascii_case(tag)) {
            return false;
        }
        if let Some(id) = &self.id {
            if node.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if self.classes.is_empty() {
            return true;
        }
        let class_list = node.class_list();
        self.classes.iter().all(|c| class_list.contains(c))
    }
}

/// A parsed structural selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn new(selector: &str) -> Self {
        Self {
            alternatives: selector.split(',').map(|s| Compound::parse(s.trim())).collect(),
        }
    }
}

impl From<&str> for Selector {
    fn from(selector: &str) -> Self {
        Self::new(selector)
    }
}

impl DomMatcher for Selector {
    fn matches(&self, node: &DomNode) -> bool {
        self.alternatives.iter().any(|c| c.matches(node))
    }
}
