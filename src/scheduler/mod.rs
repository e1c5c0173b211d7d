//! Update Scheduler - Deferred, coalesced update and render phases.
//!
//! - [`TimerQueue`] - per-host virtual-time timers
//! - [`deferred_run`] - the "run now or later, reuse the pending timer" rule
//! - [`HostServices`] - the two phases, listeners and context passing

mod services;
mod timers;

pub use services::HostServices;
pub(crate) use services::pass_contexts_to_nested;
pub use timers::{deferred_run, TimerHandle, TimerQueue};
