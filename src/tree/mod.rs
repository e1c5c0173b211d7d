//! Tree Model - The grounded tree and its traversal primitives.
//!
//! The grounded tree mirrors what should exist on the target surface. DOM
//! nodes map 1:1 to surface nodes; every other node type is pass-through.
//!
//! Queries are provided by the [`DomTree`] capability, implemented by
//! [`TreeNode`] (queries below that node) and by the host (queries below its
//! grounded root).

mod node;
mod traverse;

pub use node::{NodeKind, TreeNode, WeakTreeNode};
pub use traverse::{
    dom_parent, enumerate_dom_roots, find_nodes, previous_dom_sibling, query_by_pattern,
    DomMatcher,
};

use crate::boundary::Boundary;
use crate::surface::DomNode;
use crate::types::NodeTypes;

/// Query capability over a grounded (sub)tree.
///
/// Implementors only supply [`tree_root`](DomTree::tree_root); the root itself
/// is never part of the results.
pub trait DomTree {
    /// The node queries start below.
    fn tree_root(&self) -> TreeNode;

    /// Tree nodes of the given types, in tree order.
    fn find_tree_nodes(
        &self,
        types: NodeTypes,
        max_count: usize,
        over_hosts: bool,
        validator: Option<&dyn Fn(&TreeNode) -> bool>,
    ) -> Vec<TreeNode> {
        find_nodes(&self.tree_root(), types, max_count, over_hosts, validator)
    }

    /// Surface nodes of DOM tree nodes, in tree order.
    fn find_dom_nodes(
        &self,
        max_count: usize,
        over_hosts: bool,
        validator: Option<&dyn Fn(&TreeNode) -> bool>,
    ) -> Vec<DomNode> {
        let anchored = |node: &TreeNode| node.dom_node().is_some() && validator.is_none_or(|v| v(node));
        self.find_tree_nodes(NodeTypes::DOM, max_count, over_hosts, Some(&anchored))
            .iter()
            .filter_map(TreeNode::dom_node)
            .collect()
    }

    /// Boundaries, in tree order.
    fn find_boundaries(
        &self,
        max_count: usize,
        over_hosts: bool,
        validator: Option<&dyn Fn(&TreeNode) -> bool>,
    ) -> Vec<Boundary> {
        self.find_tree_nodes(NodeTypes::BOUNDARY, max_count, over_hosts, validator)
            .iter()
            .filter_map(TreeNode::boundary)
            .collect()
    }

    /// Surface elements accepted by `matcher`.
    fn query_dom_elements<M: DomMatcher + ?Sized>(
        &self,
        matcher: &M,
        max_count: usize,
        over_hosts: bool,
    ) -> Vec<DomNode> {
        query_by_pattern(&self.tree_root(), matcher, max_count, over_hosts)
    }

    /// First surface element accepted by `matcher`.
    fn query_dom_element<M: DomMatcher + ?Sized>(&self, matcher: &M, over_hosts: bool) -> Option<DomNode> {
        query_by_pattern(&self.tree_root(), matcher, 1, over_hosts)
            .into_iter()
            .next()
    }
}

impl DomTree for TreeNode {
    fn tree_root(&self) -> TreeNode {
        self.clone()
    }
}
