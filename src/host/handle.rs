//! Host - Top-level orchestrator of one grounded tree.
//!
//! A host owns a grounded tree, a single root boundary rendering the target
//! definition, its settings and its scheduler services.
//!
//! ```text
//! Constructing ──► Live (enabled) ◄──► Live (disabled)
//! ```
//!
//! The host is disabled while `only_run_in_container` is set and it has
//! neither a container nor a parent host; the root boundary then renders
//! nothing. Disabled state is a reactive signal.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use spark_signals::{signal, Signal};
use tracing::debug;

use crate::boundary::{component, Boundary, Def};
use crate::equality::{is_changed, Value};
use crate::scheduler::{pass_contexts_to_nested, HostServices};
use crate::surface::{Applier, DomNode, MemorySurface, Refresh, RenderInfo};
use crate::tree::{find_nodes, DomTree, NodeKind, TreeNode};
use crate::types::{Delay, Listener, NodeTypes, Phase};

use super::settings::{HostSettings, SettingsUpdate};

pub(crate) struct HostInner {
    grounded_tree: TreeNode,
    root_boundary: Boundary,
    target_def: RefCell<Option<Def>>,
    settings: RefCell<HostSettings>,
    services: HostServices,
    disabled: Signal<bool>,
    /// Stays disabled until a container shows up, even if the policy is off.
    held_detached: Cell<bool>,
}

impl Drop for HostInner {
    fn drop(&mut self) {
        self.services.clear_timers(true);
    }
}

/// Handle to a host.
#[derive(Clone)]
pub struct Host {
    inner: Rc<HostInner>,
}

/// Non-owning handle to a host.
#[derive(Clone, Default)]
pub(crate) struct WeakHost(Weak<HostInner>);

impl WeakHost {
    pub(crate) fn upgrade(&self) -> Option<Host> {
        self.0.upgrade().map(|inner| Host { inner })
    }
}

impl Host {
    /// Create a host rendering into a [`MemorySurface`].
    pub fn new(content: Option<Def>, container: Option<DomNode>, settings: Option<SettingsUpdate>) -> Self {
        Self::with_applier(content, container, settings, Rc::new(MemorySurface::new()))
    }

    /// Create a host with a custom apply layer.
    ///
    /// The initial pass runs synchronously.
    pub fn with_applier(
        content: Option<Def>,
        container: Option<DomNode>,
        settings: Option<SettingsUpdate>,
        applier: Rc<dyn Applier>,
    ) -> Self {
        let settings = settings.as_ref().map_or_else(HostSettings::default, HostSettings::with_update);
        let grounded_tree = TreeNode::new_root(container);

        let inner = Rc::new_cyclic(|weak: &Weak<HostInner>| {
            let weak_host = WeakHost(weak.clone());

            let root_component = {
                let weak_host = weak_host.clone();
                component(move |_| {
                    let host = weak_host.upgrade()?;
                    if host.is_disabled() {
                        None
                    } else {
                        host.target_def()
                    }
                })
            };
            let root_boundary = Boundary::new(weak_host.clone(), root_component, Value::empty_mapping(), Vec::new());
            root_boundary.set_always_update(true);
            let anchor = TreeNode::new(NodeKind::Boundary(root_boundary.clone()), None);
            root_boundary.set_anchor(&anchor);
            grounded_tree.append_child(&anchor);

            HostInner {
                grounded_tree,
                root_boundary,
                target_def: RefCell::new(content),
                settings: RefCell::new(settings),
                services: HostServices::new(weak_host, applier),
                disabled: signal(false),
                held_detached: Cell::new(false),
            }
        });

        let host = Host { inner };
        host.inner.disabled.set(!host.should_run());
        host.inner
            .services
            .absorb_updates(&host.inner.root_boundary, Some(Delay::Sync), Some(Delay::Sync));
        host
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn add_listener(&self, phase: Phase, listener: Listener) {
        self.inner.services.add_listener(phase, listener);
    }

    pub fn remove_listener(&self, phase: Phase, listener: &Listener) {
        self.inner.services.remove_listener(phase, listener);
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Replace the target content and re-render the root boundary.
    pub fn update(&self, content: Option<Def>, force_update: Option<Delay>, force_render: Option<Delay>) {
        *self.inner.target_def.borrow_mut() = content;
        self.inner.root_boundary.update(force_update, force_render);
    }

    /// Drop pending timers and the target content, optionally re-rendering
    /// to tear the output down.
    pub fn clear(&self, update: bool, force_update: Option<Delay>, force_render: Option<Delay>) {
        self.inner.services.clear_timers(true);
        *self.inner.target_def.borrow_mut() = None;
        if update {
            self.inner.root_boundary.update(force_update, force_render);
        }
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    fn is_detached(&self) -> bool {
        let root = &self.inner.grounded_tree;
        root.dom_node().is_none() && root.parent().is_none()
    }

    /// The container policy, without touching the disabled flag.
    fn should_run(&self) -> bool {
        if !self.is_detached() {
            self.inner.held_detached.set(false);
            return true;
        }
        !(self.inner.settings.borrow().only_run_in_container || self.inner.held_detached.get())
    }

    /// Re-evaluate the container policy.
    ///
    /// Re-renders when forced or when the host is (or was) disabled; otherwise
    /// re-issues moves for the current surface roots.
    pub fn refresh(&self, force_update: bool, force_update_delay: Option<Delay>, force_render: Option<Delay>) {
        let was_enabled = !self.is_disabled();
        let should_run = self.should_run();
        if should_run == self.is_disabled() {
            self.inner.disabled.set(!should_run);
            debug!(disabled = !should_run, "host enabled state changed");
        }

        if force_update || !should_run || !was_enabled {
            self.inner.root_boundary.update(force_update_delay, force_render);
        } else {
            let infos = self.root_move_infos();
            self.inner.services.absorb_changes(infos, None, force_render);
        }
    }

    /// Re-issue refreshes for every surface node of this host, optionally
    /// asking the applier to re-read the surface.
    pub fn refresh_render(&self, force_dom_read: bool, force_render: Option<Delay>) {
        let refresh = if force_dom_read { Refresh::Read } else { Refresh::Changed };
        let infos = find_nodes(&self.inner.grounded_tree, NodeTypes::DOM, 0, false, None)
            .into_iter()
            .filter(|node| node.dom_node().is_some())
            .map(|node| RenderInfo::refresh(node, refresh))
            .collect();
        self.inner.services.absorb_changes(infos, None, force_render);
    }

    fn root_move_infos(&self) -> Vec<RenderInfo> {
        self.inner
            .root_boundary
            .dom_roots(true)
            .into_iter()
            .map(RenderInfo::moved)
            .collect()
    }

    /// Re-point the container.
    ///
    /// When this flips the enabled state the host refreshes; otherwise the
    /// current surface roots are moved (also when there are none but
    /// `force_render` is given).
    pub fn move_into(&self, container: Option<DomNode>, force_render: Option<Delay>) {
        if self.inner.grounded_tree.dom_node() == container {
            return;
        }
        self.inner.grounded_tree.set_dom_node(container);

        if self.should_run() == self.is_disabled() {
            self.refresh(false, None, force_render);
            return;
        }
        if self.is_disabled() {
            return;
        }
        let infos = self.root_move_infos();
        if !infos.is_empty() || force_render.is_some() {
            self.inner.services.absorb_changes(infos, None, force_render);
        }
    }

    // =========================================================================
    // Settings and contexts
    // =========================================================================

    /// Merge a settings update.
    ///
    /// Toggling `welcome_contexts_up_root` re-reads contexts from the parent
    /// host; toggling `only_run_in_container` refreshes synchronously. Turning
    /// the policy off while disabled and detached keeps the host disabled
    /// until a container is attached.
    pub fn modify_settings(&self, update: &SettingsUpdate) {
        let (only_was, welcome_was) = {
            let settings = self.settings();
            (settings.only_run_in_container, settings.welcome_contexts_up_root)
        };
        self.inner.settings.borrow_mut().merge(update);
        let (only_now, welcome_now) = {
            let settings = self.settings();
            (settings.only_run_in_container, settings.welcome_contexts_up_root)
        };

        if welcome_now != welcome_was {
            let contexts = self
                .parent_host()
                .filter(|_| welcome_now)
                .map_or_else(Value::empty_mapping, |parent| parent.root_boundary().contexts());
            self.inner.services.on_context_pass(contexts);
        }
        if only_now != only_was {
            if !only_now && self.is_disabled() && self.is_detached() {
                self.inner.held_detached.set(true);
            }
            self.refresh(false, Some(Delay::Sync), Some(Delay::Sync));
        }
    }

    /// The host this one is embedded in.
    pub fn parent_host(&self) -> Option<Host> {
        self.inner.grounded_tree.parent()?.source_boundary()?.host()
    }

    /// Set this host's own contexts and pass them to nested hosts.
    pub fn provide_contexts(&self, contexts: Value) {
        let root = &self.inner.root_boundary;
        let depth = self.settings().update_live_modes.remote.depth();
        if !is_changed(&root.contexts(), &contexts, depth) {
            return;
        }
        root.set_contexts(contexts.clone());
        self.inner.services.absorb_updates(root, None, None);
        pass_contexts_to_nested(self, &contexts);
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// First surface root of the content.
    pub fn root_dom_node(&self) -> Option<DomNode> {
        self.root_dom_nodes(true).into_iter().next()
    }

    /// Surface roots of the content, optionally including nested hosts' roots.
    pub fn root_dom_nodes(&self, in_nested: bool) -> Vec<DomNode> {
        self.inner
            .root_boundary
            .dom_roots(in_nested)
            .iter()
            .filter_map(TreeNode::dom_node)
            .collect()
    }

    pub fn grounded_tree(&self) -> TreeNode {
        self.inner.grounded_tree.clone()
    }

    pub fn root_boundary(&self) -> Boundary {
        self.inner.root_boundary.clone()
    }

    pub fn target_def(&self) -> Option<Def> {
        self.inner.target_def.borrow().clone()
    }

    pub fn settings(&self) -> Ref<'_, HostSettings> {
        self.inner.settings.borrow()
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.disabled.get()
    }

    /// Reactive view of the disabled state.
    pub fn disabled_signal(&self) -> Signal<bool> {
        self.inner.disabled.clone()
    }

    pub fn services(&self) -> &HostServices {
        &self.inner.services
    }

    pub fn ptr_eq(&self, other: &Host) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Advance this host's clock, running due passes. Returns how many timers
    /// fired.
    pub fn tick(&self, elapsed: Duration) -> usize {
        self.inner.services.timers().advance(elapsed)
    }

    /// Run every pending pass now. Updates deferred past the re-render cap
    /// wait for the next call.
    pub fn flush(&self) -> usize {
        self.inner.services.timers().flush()
    }

    pub fn clear_timers(&self, force: bool) {
        self.inner.services.clear_timers(force);
    }
}

impl DomTree for Host {
    fn tree_root(&self) -> TreeNode {
        self.grounded_tree()
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("container", &self.inner.grounded_tree.dom_node())
            .field("disabled", &self.is_disabled())
            .field("services", &self.inner.services)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceOp;
    use std::cell::Cell;

    fn setup(content: Option<Def>, container: Option<DomNode>) -> (Host, Rc<MemorySurface>) {
        let surface = Rc::new(MemorySurface::new());
        let host = Host::with_applier(content, container, None, surface.clone());
        (host, surface)
    }

    fn paragraph(text: &str) -> Def {
        Def::element("p", Value::Null).with_child(Def::text(text))
    }

    #[test]
    fn test_initial_pass_is_sync() {
        let body = DomNode::element("body");
        let (host, surface) = setup(Some(paragraph("a")), Some(body.clone()));
        assert_eq!(body.outer_html(), "<body><p>a</p></body>");
        assert_eq!(surface.ops().len(), 2);
        assert_eq!(host.root_dom_node(), body.children().first().cloned());
    }

    #[test]
    fn test_update_is_deferred_and_coalesced() {
        let body = DomNode::element("body");
        let (host, _surface) = setup(Some(paragraph("a")), Some(body.clone()));
        let updates = Rc::new(Cell::new(0));
        let counter = updates.clone();
        host.add_listener(Phase::Update, Rc::new(move || counter.set(counter.get() + 1)));

        host.update(Some(paragraph("b")), None, None);
        host.update(Some(paragraph("c")), None, None);
        host.update(Some(paragraph("d")), None, None);
        assert_eq!(body.outer_html(), "<body><p>a</p></body>");

        host.tick(Duration::ZERO);
        assert_eq!(updates.get(), 1);
        assert_eq!(body.outer_html(), "<body><p>d</p></body>");
    }

    #[test]
    fn test_listeners_are_a_set() {
        let (host, _surface) = setup(None, None);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let listener: Listener = Rc::new(move || counter.set(counter.get() + 1));
        host.add_listener(Phase::Render, listener.clone());
        host.add_listener(Phase::Render, listener.clone());

        host.refresh(true, Some(Delay::Sync), Some(Delay::Sync));
        assert_eq!(calls.get(), 1);

        host.remove_listener(Phase::Render, &listener);
        host.refresh(true, Some(Delay::Sync), Some(Delay::Sync));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_clear_tears_down() {
        let body = DomNode::element("body");
        let (host, surface) = setup(Some(paragraph("a")), Some(body.clone()));
        surface.take_ops();

        host.clear(true, Some(Delay::Sync), Some(Delay::Sync));
        assert_eq!(body.outer_html(), "<body></body>");
        assert!(host.target_def().is_none());
        assert!(matches!(surface.ops()[..], [SurfaceOp::Remove(_)]));
    }

    #[test]
    fn test_refresh_render_marks_read() {
        let body = DomNode::element("body");
        let (host, surface) = setup(Some(paragraph("a")), Some(body));
        surface.take_ops();

        host.refresh_render(true, Some(Delay::Sync));
        let ops = surface.take_ops();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, SurfaceOp::Refresh(_, Refresh::Read))));
    }

    #[test]
    fn test_self_updating_component_is_bounded_per_tick() {
        let renders = Rc::new(Cell::new(0));
        let count = renders.clone();
        let restless = component(move |ctx| {
            count.set(count.get() + 1);
            let n = ctx.state().as_f64().unwrap_or(0.0);
            ctx.boundary().set_state(Value::from(n + 1.0), None, None);
            Some(Def::text("busy"))
        });
        let (host, _surface) = setup(Some(Def::boundary(&restless, Value::Null)), None);

        // One pass plus `max_re_renders` extra loops, then the rest waits.
        assert_eq!(renders.get(), 2);
        assert!(host.services().has_pending_update());

        host.tick(Duration::ZERO);
        assert_eq!(renders.get(), 4);
        host.tick(Duration::ZERO);
        assert_eq!(renders.get(), 6);
        host.flush();
        assert_eq!(renders.get(), 8);
        assert!(host.services().has_pending_update());

        host.clear_timers(true);
        host.flush();
        assert_eq!(renders.get(), 8);
    }

    #[test]
    fn test_disabled_signal_at_construction() {
        let update = SettingsUpdate {
            only_run_in_container: Some(true),
            ..Default::default()
        };
        let host = Host::new(Some(paragraph("a")), None, Some(update));
        assert!(host.is_disabled());
        assert!(host.disabled_signal().get());
        assert!(host.root_dom_nodes(true).is_empty());
    }
}
