//! TreeNode - One position of the grounded tree.
//!
//! A [`TreeNode`] is a cheap handle to shared node data. Children are owned by
//! their parent; the parent and source-boundary links are weak.
//!
//! ```text
//! Root (container)
//! └── Boundary (root boundary anchor)
//!     ├── DomElement <div>
//!     │   └── DomContent "hello"
//!     └── Host ──► nested host's Root
//! ```
//!
//! Nodes are only created top-down by the reconciler and never re-parented,
//! so the structure stays acyclic.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::boundary::{Boundary, Def, WeakBoundary};
use crate::host::Host;
use crate::surface::DomNode;
use crate::types::NodeType;

thread_local! {
    /// Counter for generating unique tree node ids.
    static NODE_ID_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn next_node_id() -> u64 {
    NODE_ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

// =============================================================================
// Node Kind
// =============================================================================

/// Node type together with its payload.
#[derive(Clone)]
pub enum NodeKind {
    Root,
    /// The boundary is owned by its anchor node.
    Boundary(Boundary),
    Pass,
    DomElement,
    DomContent,
    /// A nested host. Its grounded root points back here as parent.
    Host(Host),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Root => NodeType::Root,
            NodeKind::Boundary(_) => NodeType::Boundary,
            NodeKind::Pass => NodeType::Pass,
            NodeKind::DomElement => NodeType::DomElement,
            NodeKind::DomContent => NodeType::DomContent,
            NodeKind::Host(_) => NodeType::Host,
        }
    }
}

// =============================================================================
// TreeNode
// =============================================================================

struct NodeData {
    id: u64,
    kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<TreeNode>,
    dom_node: Option<DomNode>,
    source_boundary: Option<WeakBoundary>,
    def: Option<Def>,
}

/// Handle to a grounded-tree node.
#[derive(Clone)]
pub struct TreeNode(Rc<RefCell<NodeData>>);

/// Non-owning handle to a grounded-tree node.
#[derive(Clone, Default)]
pub struct WeakTreeNode(Weak<RefCell<NodeData>>);

impl WeakTreeNode {
    pub fn upgrade(&self) -> Option<TreeNode> {
        self.0.upgrade().map(TreeNode)
    }
}

impl TreeNode {
    /// Create a detached node.
    pub(crate) fn new(kind: NodeKind, source_boundary: Option<&Boundary>) -> Self {
        TreeNode(Rc::new(RefCell::new(NodeData {
            id: next_node_id(),
            kind,
            parent: Weak::new(),
            children: Vec::new(),
            dom_node: None,
            source_boundary: source_boundary.map(Boundary::downgrade),
            def: None,
        })))
    }

    /// Create the synthetic root of a grounded tree.
    pub(crate) fn new_root(container: Option<DomNode>) -> Self {
        let root = Self::new(NodeKind::Root, None);
        root.set_dom_node(container);
        root
    }

    /// Unique id.
    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    /// Type of this node.
    pub fn node_type(&self) -> NodeType {
        self.0.borrow().kind.node_type()
    }

    /// Kind with payload.
    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind.clone()
    }

    pub(crate) fn set_kind(&self, kind: NodeKind) {
        self.0.borrow_mut().kind = kind;
    }

    /// The boundary anchored here, for boundary nodes.
    pub fn boundary(&self) -> Option<Boundary> {
        match &self.0.borrow().kind {
            NodeKind::Boundary(b) => Some(b.clone()),
            _ => None,
        }
    }

    /// The nested host, for host nodes.
    pub fn host(&self) -> Option<Host> {
        match &self.0.borrow().kind {
            NodeKind::Host(h) => Some(h.clone()),
            _ => None,
        }
    }

    /// Parent node. For the root of a nested host this is the outer `Host` node.
    pub fn parent(&self) -> Option<TreeNode> {
        self.0.borrow().parent.upgrade().map(TreeNode)
    }

    pub(crate) fn set_parent(&self, parent: Option<&TreeNode>) {
        self.0.borrow_mut().parent = parent.map_or_else(Weak::new, |p| Rc::downgrade(&p.0));
    }

    /// Children in order.
    pub fn children(&self) -> Vec<TreeNode> {
        self.0.borrow().children.clone()
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    /// First child, if any.
    pub fn first_child(&self) -> Option<TreeNode> {
        self.0.borrow().children.first().cloned()
    }

    pub(crate) fn append_child(&self, child: &TreeNode) {
        child.set_parent(Some(self));
        self.0.borrow_mut().children.push(child.clone());
    }

    /// Replace the children. Parent links of the new children are set.
    pub(crate) fn set_children(&self, children: Vec<TreeNode>) {
        for child in &children {
            child.set_parent(Some(self));
        }
        self.0.borrow_mut().children = children;
    }

    /// Target-surface node, if this node is anchored to one.
    pub fn dom_node(&self) -> Option<DomNode> {
        self.0.borrow().dom_node.clone()
    }

    /// Set the target-surface node. Called by the apply layer on creation, and
    /// by the host for the root container.
    pub fn set_dom_node(&self, dom_node: Option<DomNode>) {
        self.0.borrow_mut().dom_node = dom_node;
    }

    /// The boundary that generated this node.
    pub fn source_boundary(&self) -> Option<Boundary> {
        self.0
            .borrow()
            .source_boundary
            .as_ref()
            .and_then(WeakBoundary::upgrade)
    }

    /// The definition last applied to this node.
    pub fn def(&self) -> Option<Def> {
        self.0.borrow().def.clone()
    }

    pub(crate) fn set_def(&self, def: Option<Def>) {
        self.0.borrow_mut().def = def;
    }

    /// Number of ancestors within the same grounded tree.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            if current.node_type() == NodeType::Root {
                break;
            }
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Whether two handles point to the same node.
    pub fn ptr_eq(&self, other: &TreeNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakTreeNode {
        WeakTreeNode(Rc::downgrade(&self.0))
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TreeNode {}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        write!(f, "TreeNode(#{} {:?}", data.id, data.kind.node_type())?;
        if let Some(dom) = &data.dom_node {
            write!(f, " {dom:?}")?;
        }
        f.write_str(")")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_links() {
        let root = TreeNode::new_root(None);
        let pass = TreeNode::new(NodeKind::Pass, None);
        let leaf = TreeNode::new(NodeKind::DomContent, None);
        root.append_child(&pass);
        pass.append_child(&leaf);

        assert_eq!(leaf.parent(), Some(pass.clone()));
        assert_eq!(pass.parent(), Some(root.clone()));
        assert!(root.parent().is_none());
        assert_eq!(leaf.depth(), 2);
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn test_set_children_relinks() {
        let parent = TreeNode::new(NodeKind::Pass, None);
        let a = TreeNode::new(NodeKind::DomElement, None);
        let b = TreeNode::new(NodeKind::DomElement, None);
        parent.set_children(vec![b.clone(), a.clone()]);
        assert_eq!(parent.children(), vec![b, a.clone()]);
        assert_eq!(a.parent(), Some(parent));
    }

    #[test]
    fn test_dom_node_slot() {
        let node = TreeNode::new(NodeKind::DomElement, None);
        assert!(node.dom_node().is_none());
        let dom = DomNode::element("div");
        node.set_dom_node(Some(dom.clone()));
        assert_eq!(node.dom_node(), Some(dom));
        assert_eq!(node.node_type(), NodeType::DomElement);
    }
}
