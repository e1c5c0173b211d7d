//! Host - Owner of a grounded tree, its settings and its scheduler.
//!
//! - [`Host`] - content, container policy, contexts, timers
//! - [`HostSettings`] / [`SettingsUpdate`] - configuration and partial updates

mod handle;
mod settings;

pub use handle::Host;
pub(crate) use handle::WeakHost;
pub use settings::{
    DuplicateBehaviour, DuplicateNodeHandler, HostSettings, LiveModes, LiveModesUpdate, SettingsUpdate, SVG_NAMESPACE_URI,
};
