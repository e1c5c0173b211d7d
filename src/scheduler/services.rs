//! HostServices - The update and render phases of one host.
//!
//! ```text
//! absorb_updates ──► [update timer] ──► run_updates ──► update listeners
//!                                          │ render infos
//! absorb_changes ─────────────────────────►▼
//!                      [render timer] ──► run_render ──► Applier::apply
//!                                                    ──► render listeners
//!                                                    ──► nested host refresh
//! ```
//!
//! Each phase has at most one pending timer. Requests arriving while a timer
//! is pending coalesce into it; the pass then works on the latest queued state.
//! A phase requested while that phase is running never recurses: the update
//! pass loops over newly queued boundaries (up to `max_re_renders` extra
//! loops), the render pass drains infos queued during apply.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::boundary::reconcile::RenderPass;
use crate::boundary::Boundary;
use crate::equality::{is_changed, Value};
use crate::host::{Host, WeakHost};
use crate::surface::{Applier, RenderInfo};
use crate::tree::DomTree;
use crate::types::{Delay, Listener, NodeTypes, Phase};

use super::timers::{deferred_run, TimerHandle, TimerQueue};

/// Scheduler state owned by one host.
pub struct HostServices {
    host: WeakHost,
    applier: Rc<dyn Applier>,
    timers: TimerQueue,
    update_timer: Cell<Option<TimerHandle>>,
    render_timer: Cell<Option<TimerHandle>>,
    pending_updates: RefCell<Vec<Boundary>>,
    pending_infos: RefCell<Vec<RenderInfo>>,
    pending_hosts: RefCell<Vec<Host>>,
    pending_render_force: Cell<Option<Delay>>,
    update_listeners: RefCell<Vec<Listener>>,
    render_listeners: RefCell<Vec<Listener>>,
    in_update: Cell<bool>,
    in_render: Cell<bool>,
    pass_counter: Cell<u64>,
}

impl HostServices {
    pub(crate) fn new(host: WeakHost, applier: Rc<dyn Applier>) -> Self {
        Self {
            host,
            applier,
            timers: TimerQueue::new(),
            update_timer: Cell::new(None),
            render_timer: Cell::new(None),
            pending_updates: RefCell::new(Vec::new()),
            pending_infos: RefCell::new(Vec::new()),
            pending_hosts: RefCell::new(Vec::new()),
            pending_render_force: Cell::new(None),
            update_listeners: RefCell::new(Vec::new()),
            render_listeners: RefCell::new(Vec::new()),
            in_update: Cell::new(false),
            in_render: Cell::new(false),
            pass_counter: Cell::new(0),
        }
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn applier(&self) -> &Rc<dyn Applier> {
        &self.applier
    }

    /// Whether an update pass is scheduled.
    pub fn has_pending_update(&self) -> bool {
        self.update_timer.get().is_some_and(|t| self.timers.is_pending(t))
    }

    /// Whether a render pass is scheduled.
    pub fn has_pending_render(&self) -> bool {
        self.render_timer.get().is_some_and(|t| self.timers.is_pending(t))
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    fn listeners(&self, phase: Phase) -> &RefCell<Vec<Listener>> {
        match phase {
            Phase::Update => &self.update_listeners,
            Phase::Render => &self.render_listeners,
        }
    }

    /// Add a listener. Adding the same `Rc` twice keeps one.
    pub fn add_listener(&self, phase: Phase, listener: Listener) {
        let mut listeners = self.listeners(phase).borrow_mut();
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    pub fn remove_listener(&self, phase: Phase, listener: &Listener) {
        self.listeners(phase)
            .borrow_mut()
            .retain(|l| !same_listener(l, listener));
    }

    fn notify(&self, phase: Phase) {
        // Cloned so listeners may add or remove listeners.
        let listeners = self.listeners(phase).borrow().clone();
        for listener in listeners {
            listener();
        }
    }

    // =========================================================================
    // Update phase
    // =========================================================================

    /// Queue a re-render of `boundary` and schedule the update phase.
    ///
    /// `force_render` is remembered for the render phase that follows.
    pub fn absorb_updates(&self, boundary: &Boundary, force_update: Option<Delay>, force_render: Option<Delay>) {
        {
            let mut pending = self.pending_updates.borrow_mut();
            if !pending.iter().any(|b| b.ptr_eq(boundary)) {
                pending.push(boundary.clone());
            }
        }
        if force_render.is_some() {
            self.pending_render_force.set(force_render);
        }
        if self.in_update.get() {
            return;
        }
        self.schedule_update(force_update);
    }

    fn schedule_update(&self, force: Option<Delay>) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let delay = host.settings().update_timeout;
        let weak = self.host.clone();
        let handle = deferred_run(
            &self.timers,
            move || {
                if let Some(host) = weak.upgrade() {
                    host.services().run_updates();
                }
            },
            self.update_timer.get(),
            delay,
            force,
        );
        if handle.is_some() {
            self.update_timer.set(handle);
        }
    }

    /// Leftovers of a capped pass always wait for the next timer turn.
    fn schedule_leftover_updates(&self) {
        if let Some(timer) = self.update_timer.take() {
            self.timers.cancel(timer);
        }
        let weak = self.host.clone();
        let handle = self.timers.schedule_next_turn(Duration::ZERO, move || {
            if let Some(host) = weak.upgrade() {
                host.services().run_updates();
            }
        });
        self.update_timer.set(Some(handle));
    }

    fn run_updates(&self) {
        self.update_timer.set(None);
        if self.in_update.replace(true) {
            return;
        }
        let Some(host) = self.host.upgrade() else {
            self.in_update.set(false);
            return;
        };
        let settings = host.settings().clone();

        let mut infos = Vec::new();
        let mut hosts = Vec::new();
        let mut loops = 0;
        loop {
            let mut pending = std::mem::take(&mut *self.pending_updates.borrow_mut());
            if pending.is_empty() {
                break;
            }
            if loops > settings.max_re_renders {
                if settings.dev_log_warnings {
                    warn!(
                        remaining = pending.len(),
                        max_re_renders = settings.max_re_renders,
                        "re-render limit reached, deferring remaining updates"
                    );
                }
                self.pending_updates.borrow_mut().extend(pending);
                break;
            }
            // Parents first: a parent's render may already cover a child.
            pending.sort_by_key(|b| b.anchor().map_or(0, |a| a.depth()));

            let id = self.pass_counter.get() + 1;
            self.pass_counter.set(id);
            let mut pass = RenderPass::new(id, self.host.clone(), &settings);
            for boundary in &pending {
                if !boundary.is_destroyed() && boundary.last_pass() != id {
                    boundary.render(&mut pass);
                }
            }
            trace!(pass = id, boundaries = pending.len(), infos = pass.infos.len(), "update loop");
            infos.append(&mut pass.infos);
            hosts.append(&mut pass.hosts);
            loops += 1;
        }
        self.in_update.set(false);
        debug!(phase = %Phase::Update, loops, infos = infos.len(), "pass done");

        self.notify(Phase::Update);

        self.pending_infos.borrow_mut().extend(infos);
        self.pending_hosts.borrow_mut().extend(hosts);
        let force = self.pending_render_force.take();
        self.schedule_render(force);

        if !self.pending_updates.borrow().is_empty() {
            self.schedule_leftover_updates();
        }
    }

    // =========================================================================
    // Render phase
    // =========================================================================

    /// Queue ready-made render infos (moves, refreshes) and schedule the render
    /// phase. `contexts`, when given, are passed on as with
    /// [`on_context_pass`](Self::on_context_pass).
    pub fn absorb_changes(&self, infos: Vec<RenderInfo>, contexts: Option<Value>, force_render: Option<Delay>) {
        self.pending_infos.borrow_mut().extend(infos);
        if let Some(contexts) = contexts {
            self.on_context_pass(contexts);
        }
        self.schedule_render(force_render);
    }

    fn schedule_render(&self, force: Option<Delay>) {
        if self.in_render.get() {
            return;
        }
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let delay = host.settings().render_timeout;
        let weak = self.host.clone();
        let handle = deferred_run(
            &self.timers,
            move || {
                if let Some(host) = weak.upgrade() {
                    host.services().run_render();
                }
            },
            self.render_timer.get(),
            delay,
            force,
        );
        if handle.is_some() {
            self.render_timer.set(handle);
        }
    }

    fn run_render(&self) {
        self.render_timer.set(None);
        if self.in_render.replace(true) {
            return;
        }
        let Some(host) = self.host.upgrade() else {
            self.in_render.set(false);
            return;
        };

        let mut nested: Vec<Host> = Vec::new();
        loop {
            let infos = std::mem::take(&mut *self.pending_infos.borrow_mut());
            let hosts = std::mem::take(&mut *self.pending_hosts.borrow_mut());
            let settings = host.settings().clone();
            if settings.dev_log_render_infos {
                debug!(count = infos.len(), ?infos, "render infos");
            }
            self.applier.apply(&infos, &settings);
            for h in hosts {
                if !nested.iter().any(|n| n.ptr_eq(&h)) {
                    nested.push(h);
                }
            }
            if self.pending_infos.borrow().is_empty() && self.pending_hosts.borrow().is_empty() {
                break;
            }
        }
        self.in_render.set(false);
        debug!(phase = %Phase::Render, nested = nested.len(), "pass done");

        self.notify(Phase::Render);

        let contexts = host.root_boundary().contexts();
        for h in nested {
            if h.grounded_tree().parent().is_some() {
                h.services().on_context_pass(contexts.clone());
            }
            h.refresh(false, Some(Delay::Sync), Some(Delay::Sync));
        }
    }

    // =========================================================================
    // Contexts and teardown
    // =========================================================================

    /// Receive contextual data from a parent host.
    ///
    /// With `welcome_contexts_up_root` off the root boundary gets an empty
    /// mapping instead. On change the root re-renders and nested hosts get the
    /// new data too.
    pub fn on_context_pass(&self, contexts: Value) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let (welcome, depth) = {
            let settings = host.settings();
            (settings.welcome_contexts_up_root, settings.update_live_modes.remote.depth())
        };
        let contexts = if welcome { contexts } else { Value::empty_mapping() };
        let root = host.root_boundary();
        if !is_changed(&root.contexts(), &contexts, depth) {
            return;
        }
        root.set_contexts(contexts.clone());
        self.absorb_updates(&root, None, None);
        pass_contexts_to_nested(&host, &contexts);
    }

    /// Cancel the pending update and render timers. With `force` the queued
    /// boundary updates are dropped too; queued render infos are kept for the
    /// next render pass.
    pub fn clear_timers(&self, force: bool) {
        if let Some(timer) = self.update_timer.take() {
            self.timers.cancel(timer);
        }
        if let Some(timer) = self.render_timer.take() {
            self.timers.cancel(timer);
        }
        if force {
            self.pending_updates.borrow_mut().clear();
            self.pending_render_force.set(None);
        }
    }
}

/// Pass `contexts` to the hosts directly nested in `host`.
pub(crate) fn pass_contexts_to_nested(host: &Host, contexts: &Value) {
    for node in host.find_tree_nodes(NodeTypes::HOST, 0, false, None) {
        if let Some(nested) = node.host() {
            nested.services().on_context_pass(contexts.clone());
        }
    }
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices")
            .field("timers", &self.timers)
            .field("pending_updates", &self.pending_updates.borrow().len())
            .field("pending_infos", &self.pending_infos.borrow().len())
            .finish()
    }
}
