//! Target Surface - Where render infos land.
//!
//! The scheduler hands ordered [`RenderInfo`] lists to an [`Applier`]. The
//! crate ships a headless [`MemorySurface`] applier over [`DomNode`] trees;
//! any other surface plugs in through the trait.

mod dom;
mod memory;
mod selector;

pub use dom::DomNode;
pub use memory::{MemorySurface, SurfaceOp};
pub use selector::Selector;

use crate::host::HostSettings;
use crate::tree::TreeNode;

/// How a node's surface state should be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Apply the node's current definition.
    Changed,
    /// Re-read the actual surface state instead of trusting the cache.
    Read,
}

/// One operation for the apply layer, targeting one tree node.
#[derive(Debug, Clone)]
pub struct RenderInfo {
    pub tree_node: TreeNode,
    /// Create the surface node (and place it).
    pub create: bool,
    /// Remove the surface node.
    pub remove: bool,
    /// Re-place the surface node after its previous sibling.
    pub move_node: bool,
    pub refresh: Option<Refresh>,
}

impl RenderInfo {
    fn with(tree_node: TreeNode) -> Self {
        Self {
            tree_node,
            create: false,
            remove: false,
            move_node: false,
            refresh: None,
        }
    }

    pub fn create(tree_node: TreeNode) -> Self {
        Self {
            create: true,
            ..Self::with(tree_node)
        }
    }

    pub fn remove(tree_node: TreeNode) -> Self {
        Self {
            remove: true,
            ..Self::with(tree_node)
        }
    }

    pub fn moved(tree_node: TreeNode) -> Self {
        Self {
            move_node: true,
            ..Self::with(tree_node)
        }
    }

    pub fn refresh(tree_node: TreeNode, refresh: Refresh) -> Self {
        Self {
            refresh: Some(refresh),
            ..Self::with(tree_node)
        }
    }
}

/// Performs target-surface mutations for a batch of render infos.
///
/// Infos arrive in tree order and must be applied in that order. Nothing is
/// reported back.
pub trait Applier {
    fn apply(&self, infos: &[RenderInfo], settings: &HostSettings);
}
