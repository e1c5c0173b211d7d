//! Traversal and query primitives over the grounded tree.
//!
//! All traversals are depth-first with sibling continuation: a node's children
//! are visited before its next sibling, which is the same order the target
//! surface lays nodes out in. They never fail; missing surface nodes are
//! skipped and "not found" is an empty result.
//!
//! `Host` nodes are borders. Their nested host's grounded tree is only entered
//! when the caller asks for it.

use crate::surface::DomNode;
use crate::types::{NodeType, NodeTypes};

use super::node::TreeNode;

// =============================================================================
// Matchers
// =============================================================================

/// Predicate over target-surface nodes (a structural selector or a closure).
pub trait DomMatcher {
    fn matches(&self, node: &DomNode) -> bool;
}

impl<F: Fn(&DomNode) -> bool> DomMatcher for F {
    fn matches(&self, node: &DomNode) -> bool {
        self(node)
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Children as seen by traversals: a `Host` node continues into the nested
/// host's grounded tree only when `into_nested_hosts`.
fn traversal_children(node: &TreeNode, into_nested_hosts: bool) -> Vec<TreeNode> {
    match node.host() {
        Some(host) if into_nested_hosts => host.grounded_tree().children(),
        Some(_) => Vec::new(),
        None => node.children(),
    }
}

/// Push children so that popping yields them in order.
fn push_reversed(stack: &mut Vec<TreeNode>, children: Vec<TreeNode>) {
    stack.extend(children.into_iter().rev());
}

/// Topmost target-surface anchors under `node`, in tree order.
///
/// Descends through pass-through nodes (boundaries, passes) and stops at the
/// first node of each branch that owns a surface node. `node` itself is
/// returned alone when it is a DOM node. Nested hosts are entered only with
/// `into_nested`.
pub fn enumerate_dom_roots(node: &TreeNode, into_nested: bool) -> Vec<TreeNode> {
    if node.node_type().is_dom() {
        return node.dom_node().map(|_| vec![node.clone()]).unwrap_or_default();
    }
    let mut roots = Vec::new();
    let mut stack = Vec::new();
    push_reversed(&mut stack, traversal_children(node, into_nested));
    while let Some(current) = stack.pop() {
        if current.node_type().is_dom() {
            if current.dom_node().is_some() {
                roots.push(current);
            }
            continue;
        }
        push_reversed(&mut stack, traversal_children(&current, into_nested));
    }
    roots
}

/// Collect descendants of `root` (exclusive) whose type is in `types` and that
/// pass `predicate`.
///
/// Stops once `max_count` matches are found (0 = unbounded).
pub fn find_nodes(
    root: &TreeNode,
    types: NodeTypes,
    max_count: usize,
    into_nested_hosts: bool,
    predicate: Option<&dyn Fn(&TreeNode) -> bool>,
) -> Vec<TreeNode> {
    let mut found = Vec::new();
    let mut stack = Vec::new();
    push_reversed(&mut stack, traversal_children(root, into_nested_hosts));
    while let Some(current) = stack.pop() {
        if types.has(current.node_type()) && predicate.is_none_or(|p| p(&current)) {
            found.push(current.clone());
            if max_count > 0 && found.len() >= max_count {
                break;
            }
        }
        push_reversed(&mut stack, traversal_children(&current, into_nested_hosts));
    }
    found
}

/// Surface elements under `root` accepted by `matcher`, in tree order.
pub fn query_by_pattern<M: DomMatcher + ?Sized>(
    root: &TreeNode,
    matcher: &M,
    max_count: usize,
    into_nested_hosts: bool,
) -> Vec<DomNode> {
    let mut found = Vec::new();
    let mut stack = Vec::new();
    push_reversed(&mut stack, traversal_children(root, into_nested_hosts));
    while let Some(current) = stack.pop() {
        if current.node_type() == NodeType::DomElement {
            if let Some(dom) = current.dom_node() {
                if matcher.matches(&dom) {
                    found.push(dom);
                    if max_count > 0 && found.len() >= max_count {
                        break;
                    }
                }
            }
        }
        push_reversed(&mut stack, traversal_children(&current, into_nested_hosts));
    }
    found
}

// =============================================================================
// Positioning
// =============================================================================

/// The surface node `node`'s surface roots belong in.
///
/// Walks up through pass-through ancestors. A grounded root answers with its
/// container, or, for a nested host without one, continues in the outer tree.
pub fn dom_parent(node: &TreeNode) -> Option<DomNode> {
    let mut current = node.parent();
    while let Some(parent) = current {
        match parent.node_type() {
            NodeType::DomElement | NodeType::DomContent => return parent.dom_node(),
            NodeType::Root => {
                if let Some(container) = parent.dom_node() {
                    return Some(container);
                }
            }
            _ => {}
        }
        current = parent.parent();
    }
    None
}

/// The surface node right before `node`'s first surface root, within the same
/// surface parent. `None` means "insert first".
pub fn previous_dom_sibling(node: &TreeNode) -> Option<DomNode> {
    let mut current = node.clone();
    loop {
        if current.node_type() == NodeType::Root {
            if current.dom_node().is_some() {
                return None;
            }
            // Nested host without its own container: continue from the host node.
            current = current.parent()?;
            continue;
        }
        let parent = current.parent()?;
        let siblings = parent.children();
        let index = siblings.iter().position(|s| s.ptr_eq(&current))?;
        for sibling in siblings[..index].iter().rev() {
            if let Some(dom) = enumerate_dom_roots(sibling, true)
                .last()
                .and_then(TreeNode::dom_node)
            {
                return Some(dom);
            }
        }
        if parent.node_type().is_dom() {
            return None;
        }
        current = parent;
    }
}

// =============================================================================
// Tests
// =============================================================================
