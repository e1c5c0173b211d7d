//! Memoized Effect - Run a callback only when its memory changed.
//!
//! An [`Effect`] stores a memory [`Value`] and an optional mount callback.
//! Each `use_*` call compares the stored memory against the new one with the
//! effect's depth (see [`crate::equality`]). Unchanged memory is a no-op;
//! changed (or forced) memory is stored and the mount callback runs. Whatever
//! the mount callback returns becomes the unmount callback.
//!
//! # Example
//!
//! ```ignore
//! use spark_dom::effect::Effect;
//! use spark_dom::equality::Value;
//!
//! let mut effect = Effect::new(
//!     Some(Box::new(|next, _prev| {
//!         println!("subscribed to {next:?}");
//!         Some(Box::new(|_prev, _next, reason| println!("unsubscribed ({reason:?})")))
//!     })),
//!     Value::Null,
//! );
//!
//! effect.use_memory(Value::from("room-1"), false); // runs
//! effect.use_memory(Value::from("room-1"), false); // no-op
//! effect.cancel(true, false);                      // unsubscribed (Cancel)
//! ```
//!
//! # Return value
//!
//! `use_memory`, `use_replacing` and `reset` return `true` when the effect ran
//! and `false` when the call was a no-op.

use std::fmt;

use crate::equality::{is_changed, CompareMode, Value, DEPTH_DEFAULT};
use crate::error::Result;

// =============================================================================
// Callback Types
// =============================================================================

/// Why an unmount callback is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountReason {
    /// The mount callback was replaced by a `use_replacing` / `reset` call.
    Use,
    /// The effect was cancelled.
    Cancel,
}

/// Unmount callback: `(previous_memory, next_memory, reason)`.
pub type OnUnmount = Box<dyn FnOnce(&Value, &Value, UnmountReason)>;

/// Mount callback: `(next_memory, previous_memory)`. May return an unmount callback.
pub type OnMount = Box<dyn FnMut(&Value, &Value) -> Option<OnUnmount>>;

// =============================================================================
// Effect
// =============================================================================

/// A memoized side effect.
pub struct Effect {
    memory: Value,
    on_mount: Option<OnMount>,
    on_unmount: Option<OnUnmount>,
    depth: i32,
}

impl Effect {
    /// Create an effect with an optional mount callback and initial memory.
    pub fn new(on_mount: Option<OnMount>, memory: Value) -> Self {
        Self {
            memory,
            on_mount,
            on_unmount: None,
            depth: DEPTH_DEFAULT,
        }
    }

    /// The last stored memory.
    pub fn memory(&self) -> &Value {
        &self.memory
    }

    /// Current comparison depth.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Whether a mount callback is installed.
    pub fn has_mount(&self) -> bool {
        self.on_mount.is_some()
    }

    /// Whether an unmount callback is pending.
    pub fn has_unmount(&self) -> bool {
        self.on_unmount.is_some()
    }

    /// Set the comparison depth. `None` restores the default (shallow).
    pub fn set_depth(&mut self, depth: Option<i32>) {
        self.depth = depth.unwrap_or(DEPTH_DEFAULT);
    }

    /// Set the comparison depth from a named mode.
    pub fn set_depth_mode(&mut self, mode: CompareMode) {
        self.depth = mode.depth();
    }

    /// Set the comparison depth from a mode name such as `"deep"`.
    pub fn set_depth_named(&mut self, name: &str) -> Result<()> {
        self.depth = name.parse::<CompareMode>()?.depth();
        Ok(())
    }

    /// Store `memory` and run the mount callback if it changed (or `force_run`).
    pub fn use_memory(&mut self, memory: Value, force_run: bool) -> bool {
        self.run(memory, force_run, None)
    }

    /// Like [`use_memory`](Self::use_memory), but when the effect runs the mount
    /// callback is first replaced by `callback` (after unmounting the old one).
    /// `None` clears the mount callback.
    ///
    /// When the memory is unchanged the old callback stays installed.
    pub fn use_replacing(&mut self, memory: Value, force_run: bool, callback: Option<OnMount>) -> bool {
        self.run(memory, force_run, Some(callback))
    }

    /// Alias for [`use_replacing`](Self::use_replacing) with the callback first.
    pub fn reset(&mut self, callback: Option<OnMount>, memory: Value, force_run: bool) -> bool {
        self.use_replacing(memory, force_run, callback)
    }

    /// Cancel the effect.
    ///
    /// With `run_unmount`, the pending unmount callback runs with reason
    /// [`UnmountReason::Cancel`] and the current memory in both positions.
    /// With `clear_callbacks`, the mount callback is dropped too.
    pub fn cancel(&mut self, run_unmount: bool, clear_callbacks: bool) {
        if run_unmount {
            if let Some(unmount) = self.on_unmount.take() {
                unmount(&self.memory, &self.memory, UnmountReason::Cancel);
            }
        }
        if clear_callbacks {
            self.on_mount = None;
            self.on_unmount = None;
        }
    }

    fn run(&mut self, memory: Value, force_run: bool, replacement: Option<Option<OnMount>>) -> bool {
        if !force_run && !is_changed(&self.memory, &memory, self.depth) {
            return false;
        }
        let previous = std::mem::replace(&mut self.memory, memory);

        if let Some(callback) = replacement {
            if let Some(unmount) = self.on_unmount.take() {
                unmount(&previous, &self.memory, UnmountReason::Use);
            }
            self.on_mount = callback;
        }

        if let Some(mount) = self.on_mount.as_mut() {
            self.on_unmount = mount(&self.memory, &previous);
        }
        true
    }
}

impl Default for Effect {
    fn default() -> Self {
        Self::new(None, Value::Null)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("memory", &self.memory)
            .field("depth", &self.depth)
            .field("has_mount", &self.on_mount.is_some())
            .field("has_unmount", &self.on_unmount.is_some())
            .finish()
    }
}

// =============================================================================
// Effectful
// =============================================================================

/// Capability for types that embed an [`Effect`].
///
/// Implement the two accessors and the rest is delegated.
pub trait Effectful {
    fn effect(&self) -> &Effect;
    fn effect_mut(&mut self) -> &mut Effect;

    fn effect_memory(&self) -> &Value {
        self.effect().memory()
    }

    fn use_effect_memory(&mut self, memory: Value, force_run: bool) -> bool {
        self.effect_mut().use_memory(memory, force_run)
    }

    fn cancel_effect(&mut self, run_unmount: bool, clear_callbacks: bool) {
        self.effect_mut().cancel(run_unmount, clear_callbacks);
    }

    fn set_effect_depth(&mut self, depth: Option<i32>) {
        self.effect_mut().set_depth(depth);
    }
}

impl Effectful for Effect {
    fn effect(&self) -> &Effect {
        self
    }

    fn effect_mut(&mut self) -> &mut Effect {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
