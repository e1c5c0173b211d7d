//! MemorySurface - Headless applier over [`DomNode`] trees.
//!
//! Creates, places, refreshes and removes surface nodes exactly as ordered and
//! keeps a log of every operation it performed.
//!
//! Placement: a node goes into its [`dom_parent`] right after its
//! [`previous_dom_sibling`]. A node without a surface parent (a detached host)
//! is taken out of the surface.

use std::cell::RefCell;
use std::collections::BTreeMap;

use tracing::trace;

use crate::boundary::{Def, DefKind};
use crate::equality::Value;
use crate::host::HostSettings;
use crate::tree::{dom_parent, previous_dom_sibling, TreeNode};

use super::{Applier, DomNode, Refresh, RenderInfo};

/// An operation performed by a [`MemorySurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Create(DomNode),
    Remove(DomNode),
    Move(DomNode),
    Refresh(DomNode, Refresh),
}

/// In-memory target surface.
#[derive(Debug, Default)]
pub struct MemorySurface {
    log: RefCell<Vec<SurfaceOp>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation so far.
    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.log.borrow().clone()
    }

    /// Drain the log.
    pub fn take_ops(&self) -> Vec<SurfaceOp> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    fn record(&self, op: SurfaceOp) {
        trace!(?op, "surface op");
        self.log.borrow_mut().push(op);
    }

    fn create(&self, tree_node: &TreeNode, def: &Def, settings: &HostSettings) -> Option<DomNode> {
        let dom = match &def.kind {
            DefKind::Element { tag, props } => {
                let namespace = dom_parent(tree_node)
                    .and_then(|parent| parent.namespace().map(str::to_string))
                    .or_else(|| (&**tag == "svg").then(|| settings.render_svg_namespace_uri.clone()));
                let element = match namespace {
                    Some(ns) => DomNode::element_ns(tag, &ns),
                    None => DomNode::element(tag),
                };
                element.replace_attributes(attributes_of(props));
                element
            }
            DefKind::Content(text) if settings.render_text_tag.is_empty() => DomNode::text(text),
            DefKind::Content(text) => {
                let wrapper = DomNode::element(&settings.render_text_tag);
                wrapper.append_child(&DomNode::text(text));
                wrapper
            }
            _ => return None,
        };
        tree_node.set_dom_node(Some(dom.clone()));
        Some(dom)
    }

    fn refresh(&self, dom: &DomNode, def: &Def, settings: &HostSettings) {
        match &def.kind {
            DefKind::Element { props, .. } => dom.replace_attributes(attributes_of(props)),
            DefKind::Content(text) if settings.render_text_tag.is_empty() => dom.set_text_content(text),
            DefKind::Content(text) => match dom.children().first() {
                Some(inner) => inner.set_text_content(text),
                None => dom.append_child(&DomNode::text(text)),
            },
            _ => {}
        }
    }
}

fn place(tree_node: &TreeNode, dom: &DomNode) {
    match dom_parent(tree_node) {
        Some(parent) => parent.insert_after(dom, previous_dom_sibling(tree_node).as_ref()),
        None => dom.detach(),
    }
}

/// Attributes from element props: strings and numbers as text, `true` as an
/// empty attribute; `false`, null and compound values are skipped.
fn attributes_of(props: &Value) -> BTreeMap<String, String> {
    let Value::Mapping(entries) = props else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(name, value)| {
            let text = match value {
                Value::Str(s) => s.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(true) => String::new(),
                _ => return None,
            };
            Some((name.to_string(), text))
        })
        .collect()
}

impl Applier for MemorySurface {
    fn apply(&self, infos: &[RenderInfo], settings: &HostSettings) {
        for info in infos {
            let node = &info.tree_node;
            if info.remove {
                if let Some(dom) = node.dom_node() {
                    dom.detach();
                    self.record(SurfaceOp::Remove(dom));
                }
                continue;
            }
            let Some(def) = node.def() else {
                continue;
            };
            if info.create {
                if let Some(dom) = self.create(node, &def, settings) {
                    place(node, &dom);
                    self.record(SurfaceOp::Create(dom));
                }
                continue;
            }
            let Some(dom) = node.dom_node() else {
                continue;
            };
            if info.move_node {
                place(node, &dom);
                self.record(SurfaceOp::Move(dom.clone()));
            }
            if let Some(refresh) = info.refresh {
                self.refresh(&dom, &def, settings);
                self.record(SurfaceOp::Refresh(dom, refresh));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::reconcile::{reconcile_children, RenderPass};
    use crate::host::WeakHost;

    fn render(root: &TreeNode, defs: Vec<Def>, surface: &MemorySurface, settings: &HostSettings) {
        let mut pass = RenderPass::new(1, WeakHost::default(), settings);
        reconcile_children(root, defs, None, &mut pass);
        surface.apply(&pass.infos, settings);
    }

    fn item(key: &str) -> Def {
        Def::element("li", Value::mapping([("id", Value::from(key))]))
            .with_key(key)
            .with_child(Def::text(key))
    }

    #[test]
    fn test_create_then_reorder() {
        let settings = HostSettings::default();
        let surface = MemorySurface::new();
        let body = DomNode::element("body");
        let root = TreeNode::new_root(Some(body.clone()));

        render(&root, vec![item("a"), item("b"), item("c")], &surface, &settings);
        assert_eq!(
            body.outer_html(),
            "<body><li id=\"a\">a</li><li id=\"b\">b</li><li id=\"c\">c</li></body>"
        );
        assert_eq!(surface.take_ops().len(), 6);

        render(&root, vec![item("c"), item("a")], &surface, &settings);
        assert_eq!(body.outer_html(), "<body><li id=\"c\">c</li><li id=\"a\">a</li></body>");
        let ops = surface.take_ops();
        assert!(matches!(ops[0], SurfaceOp::Remove(_)));
        assert!(matches!(ops[1], SurfaceOp::Move(_)));
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_svg_namespace_and_text_tag() {
        let mut settings = HostSettings::default();
        settings.render_text_tag = "span".into();
        let surface = MemorySurface::new();
        let body = DomNode::element("body");
        let root = TreeNode::new_root(Some(body.clone()));

        render(
            &root,
            vec![
                Def::element("svg", Value::Null).with_child(Def::element("circle", Value::Null)),
                Def::text("hi"),
            ],
            &surface,
            &settings,
        );
        let children = body.children();
        assert_eq!(children[0].namespace(), Some("http://www.w3.org/2000/svg"));
        assert_eq!(children[0].children()[0].namespace(), Some("http://www.w3.org/2000/svg"));
        assert_eq!(children[1].outer_html(), "<span>hi</span>");
    }

    #[test]
    fn test_attributes_of() {
        let props = Value::mapping([
            ("class", Value::from("x")),
            ("tabindex", Value::from(2)),
            ("hidden", Value::from(true)),
            ("checked", Value::from(false)),
            ("data", Value::seq([])),
        ]);
        let attrs = attributes_of(&props);
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs["tabindex"], "2");
        assert_eq!(attrs["hidden"], "");
    }
}
