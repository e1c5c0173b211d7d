//! Boundaries - Components, their definitions and the reconciler.
//!
//! - [`Def`] - resolved definitions a component returns
//! - [`Boundary`] - one instantiated component, re-rendered independently
//! - [`RenderCtx`] - what a component reads while rendering
//! - the reconciler diffing a boundary's output against its grounded nodes

mod def;
pub(crate) mod reconcile;
mod source;

pub use def::{component, defs_equal, Component, Def, DefKind};
pub use source::{Boundary, RenderCtx, WeakBoundary};
