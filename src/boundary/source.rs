//! Boundary - The unit of independent re-render.
//!
//! A boundary is one instantiated component. It is owned by its anchor tree
//! node and renders its component's output into the anchor's children.
//!
//! Lifecycle:
//! - created when a definition first grounds to a boundary node
//! - re-rendered when its props, children or state change (per the host's
//!   live modes), or when forced
//! - destroyed when its definition is removed or replaced by an incompatible
//!   one; effects are cancelled with their unmount callbacks

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::effect::{Effect, OnMount, OnUnmount};
use crate::equality::{is_changed, Value};
use crate::host::{Host, HostSettings, WeakHost};
use crate::tree::{enumerate_dom_roots, TreeNode, WeakTreeNode};
use crate::types::Delay;

use super::def::{defs_equal, Component, Def};
use super::reconcile::{reconcile_children, RenderPass};

thread_local! {
    static BOUNDARY_ID_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn next_boundary_id() -> u64 {
    BOUNDARY_ID_COUNTER.with(|counter| {
        let id = counter.get();
        counter.set(id + 1);
        id
    })
}

struct BoundaryInner {
    id: u64,
    host: WeakHost,
    anchor: RefCell<WeakTreeNode>,
    component: Component,
    props: RefCell<Value>,
    state: RefCell<Value>,
    outer_contexts: RefCell<Value>,
    children: RefCell<Vec<Def>>,
    effects: RefCell<Vec<Effect>>,
    hook_index: Cell<usize>,
    last_pass: Cell<u64>,
    always_update: Cell<bool>,
    destroyed: Cell<bool>,
}

/// Handle to a boundary.
#[derive(Clone)]
pub struct Boundary(Rc<BoundaryInner>);

/// Non-owning handle to a boundary.
#[derive(Clone)]
pub struct WeakBoundary(Weak<BoundaryInner>);

impl WeakBoundary {
    pub fn upgrade(&self) -> Option<Boundary> {
        self.0.upgrade().map(Boundary)
    }
}

impl Boundary {
    pub(crate) fn new(host: WeakHost, component: Component, props: Value, children: Vec<Def>) -> Self {
        Boundary(Rc::new(BoundaryInner {
            id: next_boundary_id(),
            host,
            anchor: RefCell::new(WeakTreeNode::default()),
            component,
            props: RefCell::new(props),
            state: RefCell::new(Value::Null),
            outer_contexts: RefCell::new(Value::empty_mapping()),
            children: RefCell::new(children),
            effects: RefCell::new(Vec::new()),
            hook_index: Cell::new(0),
            last_pass: Cell::new(0),
            always_update: Cell::new(false),
            destroyed: Cell::new(false),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// The tree node this boundary renders under.
    pub fn anchor(&self) -> Option<TreeNode> {
        self.0.anchor.borrow().upgrade()
    }

    pub(crate) fn set_anchor(&self, anchor: &TreeNode) {
        *self.0.anchor.borrow_mut() = anchor.downgrade();
    }

    /// The host this boundary lives in.
    pub fn host(&self) -> Option<Host> {
        self.0.host.upgrade()
    }

    pub fn props(&self) -> Value {
        self.0.props.borrow().clone()
    }

    pub fn state(&self) -> Value {
        self.0.state.borrow().clone()
    }

    /// Contextual data inherited from outside.
    pub fn contexts(&self) -> Value {
        self.0.outer_contexts.borrow().clone()
    }

    pub(crate) fn set_contexts(&self, contexts: Value) {
        *self.0.outer_contexts.borrow_mut() = contexts;
    }

    /// Child definitions handed over by the parent.
    pub fn child_defs(&self) -> Vec<Def> {
        self.0.children.borrow().clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    /// Re-render on every pass that reaches this boundary.
    pub fn set_always_update(&self, always: bool) {
        self.0.always_update.set(always);
    }

    /// Replace the state. Schedules a re-render when it changed under the
    /// host's `state` live mode.
    pub fn set_state(&self, state: Value, force_update: Option<Delay>, force_render: Option<Delay>) {
        let host = self.host();
        let depth = host
            .as_ref()
            .map_or(crate::equality::DEPTH_DEFAULT, |h| h.settings().update_live_modes.state.depth());
        let changed = is_changed(&self.0.state.borrow(), &state, depth);
        *self.0.state.borrow_mut() = state;
        if let (true, Some(host)) = (changed, host) {
            host.services().absorb_updates(self, force_update, force_render);
        }
    }

    /// Request a re-render regardless of changes.
    pub fn update(&self, force_update: Option<Delay>, force_render: Option<Delay>) {
        if let Some(host) = self.host() {
            host.services().absorb_updates(self, force_update, force_render);
        }
    }

    /// Topmost surface-anchored nodes of this boundary's output.
    pub fn dom_roots(&self, into_nested: bool) -> Vec<TreeNode> {
        self.anchor()
            .map(|anchor| enumerate_dom_roots(&anchor, into_nested))
            .unwrap_or_default()
    }

    /// Take new props, children and contexts from the parent's render.
    /// Returns whether the boundary should re-render.
    pub(crate) fn receive(
        &self,
        props: Value,
        children: Vec<Def>,
        contexts: Value,
        settings: &HostSettings,
    ) -> bool {
        let modes = &settings.update_live_modes;
        let props_changed = is_changed(&self.0.props.borrow(), &props, modes.props.depth());
        let children_changed = !defs_equal(&self.0.children.borrow(), &children, modes.children.depth());
        let contexts_changed = is_changed(&self.0.outer_contexts.borrow(), &contexts, modes.remote.depth());
        *self.0.props.borrow_mut() = props;
        *self.0.children.borrow_mut() = children;
        *self.0.outer_contexts.borrow_mut() = contexts;
        props_changed || children_changed || contexts_changed || self.0.always_update.get()
    }

    pub(crate) fn last_pass(&self) -> u64 {
        self.0.last_pass.get()
    }

    /// Run the component and reconcile its output under the anchor.
    pub(crate) fn render(&self, pass: &mut RenderPass<'_>) {
        if self.is_destroyed() {
            return;
        }
        let Some(anchor) = self.anchor() else {
            return;
        };
        self.0.last_pass.set(pass.id);
        self.0.hook_index.set(0);

        let component = self.0.component.clone();
        let output = component(&RenderCtx { boundary: self });
        trace!(boundary = self.id(), "rendered");

        reconcile_children(&anchor, output.into_iter().collect(), Some(self), pass);
    }

    /// Mark destroyed and cancel every effect, running unmounts.
    pub(crate) fn destroy(&self) {
        if self.0.destroyed.replace(true) {
            return;
        }
        let effects = std::mem::take(&mut *self.0.effects.borrow_mut());
        for mut effect in effects {
            effect.cancel(true, true);
        }
    }

    pub fn downgrade(&self) -> WeakBoundary {
        WeakBoundary(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Boundary) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Run the hook effect at the current hook index.
    fn use_effect(&self, memory: Value, on_mount: OnMount) -> bool {
        let index = self.0.hook_index.get();
        self.0.hook_index.set(index + 1);

        // Taken out while running so callbacks may touch the boundary.
        let existing = {
            let mut effects = self.0.effects.borrow_mut();
            effects.get_mut(index).map(std::mem::take)
        };
        match existing {
            Some(mut effect) => {
                let ran = effect.use_replacing(memory, false, Some(on_mount));
                self.store_effect(index, effect);
                ran
            }
            None => {
                let mut effect = Effect::new(Some(on_mount), Value::Null);
                effect.use_memory(memory, true);
                self.store_effect(index, effect);
                true
            }
        }
    }

    fn store_effect(&self, index: usize, mut effect: Effect) {
        if self.is_destroyed() {
            effect.cancel(true, true);
            return;
        }
        let mut effects = self.0.effects.borrow_mut();
        match effects.get_mut(index) {
            Some(slot) => *slot = effect,
            None => effects.push(effect),
        }
    }
}

impl PartialEq for Boundary {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Boundary")
            .field("id", &self.0.id)
            .field("props", &*self.0.props.borrow())
            .field("state", &*self.0.state.borrow())
            .field("destroyed", &self.0.destroyed.get())
            .finish()
    }
}

// =============================================================================
// RenderCtx
// =============================================================================

/// What a component sees while rendering.
pub struct RenderCtx<'a> {
    boundary: &'a Boundary,
}

impl RenderCtx<'_> {
    pub fn props(&self) -> Value {
        self.boundary.props()
    }

    pub fn state(&self) -> Value {
        self.boundary.state()
    }

    pub fn contexts(&self) -> Value {
        self.boundary.contexts()
    }

    /// Child definitions passed by the parent.
    pub fn children(&self) -> Vec<Def> {
        self.boundary.child_defs()
    }

    /// The rendering boundary (clone it to set state later).
    pub fn boundary(&self) -> &Boundary {
        self.boundary
    }

    /// Hook-style memoized effect, identified by call order within the render.
    ///
    /// Runs `on_mount` on first use and whenever `memory` changed since the
    /// last render. Returns whether it ran.
    pub fn use_effect(
        &self,
        memory: Value,
        on_mount: impl FnMut(&Value, &Value) -> Option<OnUnmount> + 'static,
    ) -> bool {
        self.boundary.use_effect(memory, Box::new(on_mount))
    }
}
