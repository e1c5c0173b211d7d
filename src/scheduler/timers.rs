//! Timers - Per-host virtual-time timer queue.
//!
//! Deferred phases are scheduled on a [`TimerQueue`] instead of an OS timer.
//! The owner drives time explicitly: [`TimerQueue::advance`] fires everything
//! due within the elapsed window, [`TimerQueue::flush`] fires everything.
//! Timers fire one at a time in due order (ties by scheduling order), and a
//! callback may schedule or cancel other timers while running.
//!
//! Each `advance` or `flush` call is one *turn*. Timers scheduled with
//! [`TimerQueue::schedule_next_turn`] never fire in the turn that created
//! them, so a callback rescheduling itself cannot keep a turn running.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::Duration;

use crate::types::Delay;

/// Handle of a scheduled timer. Stale handles are harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Timer {
    handle: TimerHandle,
    due: Duration,
    /// First turn this timer may fire in.
    turn: u64,
    callback: Box<dyn FnOnce()>,
}

/// Single-threaded timer queue with a virtual clock.
#[derive(Default)]
pub struct TimerQueue {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    turn: Cell<u64>,
    timers: RefCell<Vec<Timer>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Schedule `callback` to run `delay` from now.
    pub fn schedule(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerHandle {
        self.push(delay, self.turn.get(), Box::new(callback))
    }

    /// Schedule `callback` like [`schedule`](Self::schedule), but never in the
    /// current turn.
    pub fn schedule_next_turn(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerHandle {
        self.push(delay, self.turn.get() + 1, Box::new(callback))
    }

    fn push(&self, delay: Duration, turn: u64, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = TimerHandle(id);
        self.timers.borrow_mut().push(Timer {
            handle,
            due: self.now.get() + delay,
            turn,
            callback,
        });
        handle
    }

    /// Cancel a pending timer. Returns whether it was pending.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let mut timers = self.timers.borrow_mut();
        let before = timers.len();
        timers.retain(|t| t.handle != handle);
        timers.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.borrow().iter().any(|t| t.handle == handle)
    }

    pub fn pending_count(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Cancel everything.
    pub fn clear(&self) {
        self.timers.borrow_mut().clear();
    }

    /// Remove the earliest timer due at or before `limit` (any when `None`).
    fn pop_due(&self, limit: Option<Duration>) -> Option<Timer> {
        let turn = self.turn.get();
        let mut timers = self.timers.borrow_mut();
        let index = timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.turn <= turn && limit.is_none_or(|limit| t.due <= limit))
            .min_by_key(|(_, t)| (t.due, t.handle.0))
            .map(|(i, _)| i)?;
        Some(timers.remove(index))
    }

    fn fire(&self, timer: Timer) {
        self.now.set(self.now.get().max(timer.due));
        (timer.callback)();
    }

    /// Move the clock forward, firing due timers. Returns how many fired.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let target = self.now.get() + elapsed;
        self.turn.set(self.turn.get() + 1);
        let mut fired = 0;
        while let Some(timer) = self.pop_due(Some(target)) {
            self.fire(timer);
            fired += 1;
        }
        self.now.set(target);
        fired
    }

    /// Fire every pending timer, including ones scheduled while flushing.
    /// Timers deferred to the next turn stay pending.
    pub fn flush(&self) -> usize {
        self.turn.set(self.turn.get() + 1);
        let mut fired = 0;
        while let Some(timer) = self.pop_due(None) {
            self.fire(timer);
            fired += 1;
        }
        fired
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.now.get())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Run `callback` now or later, coalescing with a pending timer.
///
/// - An explicit `force_delay` cancels the `current` timer first.
/// - The effective delay is `force_delay`, else `default_delay`.
/// - [`Delay::Sync`] runs the callback right away.
/// - Otherwise a still pending `current` timer is kept (the callback is
///   dropped), or a new timer is scheduled.
///
/// Returns the timer the caller should store.
pub fn deferred_run(
    timers: &TimerQueue,
    callback: impl FnOnce() + 'static,
    current: Option<TimerHandle>,
    default_delay: Delay,
    force_delay: Option<Delay>,
) -> Option<TimerHandle> {
    let mut current = current.filter(|handle| timers.is_pending(*handle));
    if let (Some(handle), Some(_)) = (current, force_delay) {
        timers.cancel(handle);
        current = None;
    }
    match force_delay.unwrap_or(default_delay) {
        Delay::Sync => {
            callback();
            current
        }
        Delay::After(delay) => Some(current.unwrap_or_else(|| timers.schedule(delay, callback))),
    }
}
