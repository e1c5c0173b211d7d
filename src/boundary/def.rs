//! Def - Resolved "what should exist" declarations.
//!
//! A [`Def`] is the minimal definition value the core consumes: an element, a
//! text node, a fragment, a component boundary or an embedded host, with an
//! optional key and child definitions.
//!
//! ```ignore
//! let list = Def::element("ul", Value::empty_mapping()).with_children(
//!     items.iter().map(|item| {
//!         Def::element("li", Value::empty_mapping())
//!             .with_key(item.id.as_str())
//!             .with_child(Def::text(&item.label))
//!     }),
//! );
//! ```

use std::fmt;
use std::rc::Rc;

use crate::equality::{are_equal, Value, DEPTH_DEEP};
use crate::host::Host;

use super::RenderCtx;

/// A component: renders a boundary's output from its context.
pub type Component = Rc<dyn Fn(&RenderCtx<'_>) -> Option<Def>>;

/// Wrap a closure as a [`Component`].
///
/// Keep the returned `Rc` around and reuse it: boundaries are matched across
/// renders by component identity.
pub fn component(render: impl Fn(&RenderCtx<'_>) -> Option<Def> + 'static) -> Component {
    Rc::new(render)
}

/// What a definition declares.
#[derive(Clone)]
pub enum DefKind {
    /// A surface element with its props (a mapping of attributes).
    Element { tag: Rc<str>, props: Value },
    /// A surface text node.
    Content(Rc<str>),
    /// Pass-through grouping of the children.
    Fragment,
    /// A component instance. Children are handed to the component.
    Boundary { component: Component, props: Value },
    /// An embedded host.
    Host(Host),
}

/// A resolved definition.
#[derive(Clone)]
pub struct Def {
    pub kind: DefKind,
    pub key: Option<Rc<str>>,
    pub children: Vec<Def>,
}

impl Def {
    fn of(kind: DefKind) -> Self {
        Self {
            kind,
            key: None,
            children: Vec::new(),
        }
    }

    pub fn element(tag: &str, props: Value) -> Self {
        Self::of(DefKind::Element {
            tag: Rc::from(tag),
            props,
        })
    }

    pub fn text(content: &str) -> Self {
        Self::of(DefKind::Content(Rc::from(content)))
    }

    pub fn fragment(children: impl IntoIterator<Item = Def>) -> Self {
        Self::of(DefKind::Fragment).with_children(children)
    }

    pub fn boundary(component: &Component, props: Value) -> Self {
        Self::of(DefKind::Boundary {
            component: component.clone(),
            props,
        })
    }

    pub fn host(host: &Host) -> Self {
        Self::of(DefKind::Host(host.clone()))
    }

    pub fn with_key(mut self, key: impl Into<Rc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Def>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    pub fn with_child(mut self, child: Def) -> Self {
        self.children.push(child);
        self
    }

    /// Element tag, if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            DefKind::Element { tag, .. } => Some(&**tag),
            _ => None,
        }
    }

    /// Props of elements and boundaries (`Null` otherwise).
    pub fn props(&self) -> Value {
        match &self.kind {
            DefKind::Element { props, .. } | DefKind::Boundary { props, .. } => props.clone(),
            _ => Value::Null,
        }
    }

    /// Text of a content definition.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            DefKind::Content(text) => Some(&**text),
            _ => None,
        }
    }

    /// Whether a node grounded from `self` can be reused for `other`.
    ///
    /// Keys must match. Elements must share the tag, boundaries the component
    /// and host definitions the host.
    pub fn is_compatible(&self, other: &Def) -> bool {
        if self.key != other.key {
            return false;
        }
        match (&self.kind, &other.kind) {
            (DefKind::Element { tag: a, .. }, DefKind::Element { tag: b, .. }) => a == b,
            (DefKind::Content(_), DefKind::Content(_)) => true,
            (DefKind::Fragment, DefKind::Fragment) => true,
            (DefKind::Boundary { component: a, .. }, DefKind::Boundary { component: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            (DefKind::Host(a), DefKind::Host(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Compare two child definition lists.
///
/// Definitions are rebuilt on every render, so at depth 0 two non-empty lists
/// are always different. Deeper comparisons walk the definitions and compare
/// props with the remaining depth.
pub fn defs_equal(a: &[Def], b: &[Def], depth: i32) -> bool {
    if a.is_empty() && b.is_empty() {
        return true;
    }
    if depth == 0 || depth < DEPTH_DEEP || a.len() != b.len() {
        return false;
    }
    let inner = if depth == DEPTH_DEEP { DEPTH_DEEP } else { depth - 1 };
    a.iter().zip(b).all(|(x, y)| {
        x.is_compatible(y)
            && x.text_content() == y.text_content()
            && are_equal(&x.props(), &y.props(), inner)
            && defs_equal(&x.children, &y.children, inner)
    })
}

impl fmt::Debug for Def {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DefKind::Element { tag, props } => write!(f, "<{tag} {props:?}>")?,
            DefKind::Content(text) => write!(f, "{text:?}")?,
            DefKind::Fragment => f.write_str("<>")?,
            DefKind::Boundary { props, .. } => write!(f, "<Boundary {props:?}>")?,
            DefKind::Host(_) => f.write_str("<Host>")?,
        }
        if let Some(key) = &self.key {
            write!(f, " key={key:?}")?;
        }
        if !self.children.is_empty() {
            f.debug_list().entries(&self.children).finish()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        let div = Def::element("div", Value::Null);
        assert!(div.is_compatible(&Def::element("div", Value::from("x"))));
        assert!(!div.is_compatible(&Def::element("span", Value::Null)));
        assert!(!div.is_compatible(&Def::text("div")));
        assert!(!div.is_compatible(&Def::element("div", Value::Null).with_key("a")));

        let comp = component(|_| None);
        let other = component(|_| None);
        assert!(Def::boundary(&comp, Value::Null).is_compatible(&Def::boundary(&comp, Value::from(1))));
        assert!(!Def::boundary(&comp, Value::Null).is_compatible(&Def::boundary(&other, Value::Null)));
    }

    #[test]
    fn test_defs_equal_depths() {
        let a = vec![Def::text("x")];
        let b = vec![Def::text("x")];
        assert!(defs_equal(&[], &[], 0));
        assert!(!defs_equal(&a, &b, 0));
        assert!(defs_equal(&a, &b, 1));
        assert!(!defs_equal(&a, &[Def::text("y")], DEPTH_DEEP));
    }
}
