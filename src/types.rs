//! Core types for spark-dom.
//!
//! Small shared vocabulary: node types and type filters, scheduler phases,
//! deferral delays and listener callbacks.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

// =============================================================================
// Node Types
// =============================================================================

/// What kind of position a tree node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// The synthetic root of a host's grounded tree.
    Root,
    /// Anchor of a boundary's output.
    Boundary,
    /// Pass-through grouping (fragments).
    Pass,
    /// A target-surface element.
    DomElement,
    /// A target-surface text node.
    DomContent,
    /// A nested host embedded in this tree.
    Host,
}

impl NodeType {
    /// Whether nodes of this type map 1:1 to a target-surface node.
    pub const fn is_dom(self) -> bool {
        matches!(self, NodeType::DomElement | NodeType::DomContent)
    }

    /// The single-bit filter for this type.
    pub const fn flag(self) -> NodeTypes {
        match self {
            NodeType::Root => NodeTypes::ROOT,
            NodeType::Boundary => NodeTypes::BOUNDARY,
            NodeType::Pass => NodeTypes::PASS,
            NodeType::DomElement => NodeTypes::DOM_ELEMENT,
            NodeType::DomContent => NodeTypes::DOM_CONTENT,
            NodeType::Host => NodeTypes::HOST,
        }
    }
}

bitflags::bitflags! {
    /// A set of [`NodeType`]s used to filter traversals.
    ///
    /// Combine with bitwise OR: `NodeTypes::BOUNDARY | NodeTypes::HOST`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeTypes: u8 {
        const ROOT = 1 << 0;
        const BOUNDARY = 1 << 1;
        const PASS = 1 << 2;
        const DOM_ELEMENT = 1 << 3;
        const DOM_CONTENT = 1 << 4;
        const HOST = 1 << 5;
        const DOM = Self::DOM_ELEMENT.bits() | Self::DOM_CONTENT.bits();
    }
}

impl NodeTypes {
    /// Whether the set contains `node_type`.
    pub const fn has(self, node_type: NodeType) -> bool {
        self.contains(node_type.flag())
    }
}

impl From<NodeType> for NodeTypes {
    fn from(node_type: NodeType) -> Self {
        node_type.flag()
    }
}

impl FromIterator<NodeType> for NodeTypes {
    fn from_iter<I: IntoIterator<Item = NodeType>>(iter: I) -> Self {
        iter.into_iter().fold(NodeTypes::empty(), |set, t| set | t.flag())
    }
}

// =============================================================================
// Scheduling
// =============================================================================

/// The two deferrable phases of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Boundary re-render decisions.
    Update,
    /// Applying accumulated render infos to the target surface.
    Render,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Update => "update",
            Phase::Render => "render",
        })
    }
}

/// How long a phase is deferred.
///
/// Places that accept an override take `Option<Delay>`: `None` means "use the
/// configured default", `Some(Delay::Sync)` means "run right now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// Execute synchronously, no timer.
    Sync,
    /// Schedule for later. Zero still defers.
    After(Duration),
}

impl Delay {
    /// Deferred by `ms` milliseconds.
    pub const fn ms(ms: u64) -> Self {
        Delay::After(Duration::from_millis(ms))
    }

    /// Whether this delay executes synchronously.
    pub const fn is_sync(self) -> bool {
        matches!(self, Delay::Sync)
    }
}

impl Default for Delay {
    fn default() -> Self {
        Delay::ms(0)
    }
}

/// `null` is [`Delay::Sync`], a number is milliseconds.
impl<'de> Deserialize<'de> for Delay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<u64>::deserialize(deserializer)? {
            None => Delay::Sync,
            Some(ms) => Delay::ms(ms),
        })
    }
}

/// Phase listener. Identity (for removal) is the `Rc` allocation.
pub type Listener = Rc<dyn Fn()>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_types_filter() {
        let set = NodeTypes::BOUNDARY | NodeTypes::HOST;
        assert!(set.has(NodeType::Boundary));
        assert!(set.has(NodeType::Host));
        assert!(!set.has(NodeType::DomElement));

        assert!(NodeTypes::DOM.has(NodeType::DomContent));
        let collected: NodeTypes = [NodeType::Pass, NodeType::Root].into_iter().collect();
        assert_eq!(collected, NodeTypes::PASS | NodeTypes::ROOT);
    }

    #[test]
    fn test_delay_deserialize() {
        let sync: Delay = serde_json::from_str("null").unwrap();
        assert_eq!(sync, Delay::Sync);
        let later: Delay = serde_json::from_str("25").unwrap();
        assert_eq!(later, Delay::ms(25));
        assert_eq!(Delay::default(), Delay::After(Duration::ZERO));
    }
}
