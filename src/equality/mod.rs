//! Equality Engine - The one comparator behind every change decision.
//!
//! Props, state, contexts, child lists and effect memories are all compared
//! with [`are_equal`] under an integer depth policy (see [`compare`]).
//!
//! ```ignore
//! use spark_dom::equality::{are_equal, Value, CompareMode};
//!
//! let a = Value::mapping([("x", Value::from(1))]);
//! let b = Value::mapping([("x", Value::from(1))]);
//!
//! assert!(!are_equal(&a, &b, CompareMode::Changed.depth())); // different allocations
//! assert!(are_equal(&a, &b, CompareMode::Shallow.depth()));
//! ```

pub mod compare;
mod value;

pub use compare::{are_equal, is_changed, CompareMode, DEPTH_ALWAYS, DEPTH_DEEP, DEPTH_DEFAULT};
pub use value::{Value, ValueKind};
