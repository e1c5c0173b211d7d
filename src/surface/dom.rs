//! DomNode - A minimal target-surface node.
//!
//! Tree nodes point at target-surface nodes through [`DomNode`] handles. The
//! handle is a cheap clone of a shared node; equality is identity.
//!
//! This is just enough surface to host the grounded tree headlessly: a tag (or
//! none for text), text content, attributes, an optional namespace and a parent
//! link with ordered children.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

thread_local! {
    /// Counter for generating unique surface node ids.
    static DOM_ID_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn next_dom_id() -> u64 {
    DOM_ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

struct DomData {
    id: u64,
    tag: Option<Rc<str>>,
    namespace: Option<Rc<str>>,
    text: RefCell<String>,
    attributes: RefCell<BTreeMap<String, String>>,
    parent: RefCell<Weak<DomData>>,
    children: RefCell<Vec<DomNode>>,
}

/// Handle to a target-surface node.
#[derive(Clone)]
pub struct DomNode(Rc<DomData>);

impl DomNode {
    fn with(tag: Option<Rc<str>>, namespace: Option<Rc<str>>, text: String) -> Self {
        DomNode(Rc::new(DomData {
            id: next_dom_id(),
            tag,
            namespace,
            text: RefCell::new(text),
            attributes: RefCell::new(BTreeMap::new()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    /// Create an element node.
    pub fn element(tag: &str) -> Self {
        Self::with(Some(Rc::from(tag)), None, String::new())
    }

    /// Create an element node in a namespace (e.g. SVG).
    pub fn element_ns(tag: &str, namespace: &str) -> Self {
        Self::with(Some(Rc::from(tag)), Some(Rc::from(namespace)), String::new())
    }

    /// Create a text node.
    pub fn text(content: &str) -> Self {
        Self::with(None, None, content.to_string())
    }

    /// Unique id of this node.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Element tag, `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        self.0.tag.as_deref()
    }

    /// Namespace URI, if created in one.
    pub fn namespace(&self) -> Option<&str> {
        self.0.namespace.as_deref()
    }

    /// Whether this is an element.
    pub fn is_element(&self) -> bool {
        self.0.tag.is_some()
    }

    /// Text content of a text node.
    pub fn text_content(&self) -> String {
        self.0.text.borrow().clone()
    }

    /// Replace the text content.
    pub fn set_text_content(&self, text: &str) {
        *self.0.text.borrow_mut() = text.to_string();
    }

    /// Read an attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    /// Set an attribute.
    pub fn set_attribute(&self, name: &str, value: &str) {
        self.0
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    /// Replace all attributes.
    pub fn replace_attributes(&self, attributes: BTreeMap<String, String>) {
        *self.0.attributes.borrow_mut() = attributes;
    }

    /// Class names from the `class` attribute.
    pub fn class_list(&self) -> Vec<String> {
        self.attribute("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Parent surface node.
    pub fn parent(&self) -> Option<DomNode> {
        self.0.parent.borrow().upgrade().map(DomNode)
    }

    /// Children in order.
    pub fn children(&self) -> Vec<DomNode> {
        self.0.children.borrow().clone()
    }

    /// Whether two handles point to the same node.
    pub fn ptr_eq(&self, other: &DomNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Detach from the current parent (no-op when detached).
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent
                .0
                .children
                .borrow_mut()
                .retain(|child| !child.ptr_eq(self));
        }
        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// Insert `child` right after `previous`, or first when `previous` is `None`.
    ///
    /// The child is detached from wherever it was. A `previous` that is not a
    /// child of this node appends.
    pub fn insert_after(&self, child: &DomNode, previous: Option<&DomNode>) {
        child.detach();
        let mut children = self.0.children.borrow_mut();
        let index = match previous {
            None => 0,
            Some(prev) => children
                .iter()
                .position(|c| c.ptr_eq(prev))
                .map_or(children.len(), |i| i + 1),
        };
        children.insert(index, child.clone());
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
    }

    /// Append `child` as the last child.
    pub fn append_child(&self, child: &DomNode) {
        child.detach();
        self.0.children.borrow_mut().push(child.clone());
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
    }

    /// Serialize the subtree as markup (for tests and debugging).
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self.tag() {
            None => out.push_str(&self.text_content()),
            Some(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in self.0.attributes.borrow().iter() {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                for child in self.children() {
                    child.write_html(out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for DomNode {}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => write!(f, "<{tag}#{}>", self.id()),
            None => write!(f, "{:?}#{}", self.text_content(), self.id()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_after_and_detach() {
        let parent = DomNode::element("ul");
        let a = DomNode::element("li");
        let b = DomNode::element("li");
        let c = DomNode::element("li");

        parent.insert_after(&a, None);
        parent.insert_after(&c, Some(&a));
        parent.insert_after(&b, Some(&a));
        assert_eq!(parent.children(), vec![a.clone(), b.clone(), c.clone()]);

        // Moving within the same parent.
        parent.insert_after(&a, Some(&c));
        assert_eq!(parent.children(), vec![b.clone(), c.clone(), a.clone()]);

        b.detach();
        assert!(b.parent().is_none());
        assert_eq!(parent.children(), vec![c, a]);
    }

    #[test]
    fn test_outer_html() {
        let div = DomNode::element("div");
        div.set_attribute("class", "a b");
        div.append_child(&DomNode::text("hi"));
        assert_eq!(div.outer_html(), "<div class=\"a b\">hi</div>");
        assert_eq!(div.class_list(), vec!["a", "b"]);
    }
}
