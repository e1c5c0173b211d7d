//! # spark-dom
//!
//! Reactive UI reconciliation core for Rust.
//!
//! Components are rendered into a *grounded tree* that mirrors what should
//! exist on a target surface. Each host owns one grounded tree and runs two
//! deferred, coalesced phases:
//!
//! ```text
//! set_state / update ──► update phase ──► render infos ──► render phase ──► Applier
//!                        (reconcile)                       (apply in tree order)
//! ```
//!
//! Change decisions go through a single depth-based equality engine.
//! Timing runs on a per-host virtual clock driven with [`Host::tick`] and
//! [`Host::flush`].
//!
//! ## Modules
//!
//! - [`equality`] - Value model and depth-based comparison
//! - [`effect`] - Memory-driven mount/unmount effects
//! - [`tree`] - Grounded tree nodes and traversal
//! - [`boundary`] - Components, definitions and the reconciler
//! - [`scheduler`] - Timers and the update/render phases
//! - [`surface`] - Render infos, the apply seam and an in-memory surface
//! - [`host`] - Hosts and their settings

pub mod boundary;
pub mod effect;
pub mod equality;
pub mod error;
pub mod host;
pub mod scheduler;
pub mod surface;
pub mod tree;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use boundary::{component, Boundary, Component, Def, DefKind, RenderCtx};
pub use effect::{Effect, Effectful, OnMount, OnUnmount, UnmountReason};
pub use equality::{are_equal, is_changed, CompareMode, Value, ValueKind};
pub use error::{Error, Result};
pub use host::{Host, HostSettings, LiveModesUpdate, SettingsUpdate};
pub use scheduler::TimerQueue;
pub use surface::{Applier, DomNode, MemorySurface, Refresh, RenderInfo, Selector, SurfaceOp};
pub use tree::{DomMatcher, DomTree, NodeKind, TreeNode};
