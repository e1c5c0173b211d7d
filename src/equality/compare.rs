//! Depth-bounded structural comparison.
//!
//! # Depth policy
//!
//! | depth | meaning                                                   |
//! |-------|-----------------------------------------------------------|
//! | ≤ -2  | "always different": callers skip the comparison entirely  |
//! | -1    | full deep equality                                        |
//! | 0     | identity only                                             |
//! | 1     | shallow: members compared by identity                     |
//! | N     | N structural levels, identity below that                  |
//!
//! Each structural step consumes exactly one level whatever the kind.
//! A negative depth never reaches 0 by decrementing, so anything below 0 that
//! does reach the comparator recurses without bound.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::value::Value;
use crate::error::Error;

/// Depth that marks "always treat as changed".
pub const DEPTH_ALWAYS: i32 = -2;
/// Unbounded depth.
pub const DEPTH_DEEP: i32 = -1;
/// Default depth used by effects (shallow).
pub const DEPTH_DEFAULT: i32 = 1;

// =============================================================================
// Named Modes
// =============================================================================

/// Named comparison modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Never compare, always changed (-2).
    Always,
    /// Full deep comparison (-1).
    Deep,
    /// Identity only (0).
    Changed,
    /// One structural level (1).
    Shallow,
    /// Two structural levels (2).
    Double,
}

impl CompareMode {
    /// The integer depth this mode stands for.
    pub const fn depth(self) -> i32 {
        match self {
            CompareMode::Always => DEPTH_ALWAYS,
            CompareMode::Deep => DEPTH_DEEP,
            CompareMode::Changed => 0,
            CompareMode::Shallow => 1,
            CompareMode::Double => 2,
        }
    }

    /// Lowercase name of the mode.
    pub const fn name(self) -> &'static str {
        match self {
            CompareMode::Always => "always",
            CompareMode::Deep => "deep",
            CompareMode::Changed => "changed",
            CompareMode::Shallow => "shallow",
            CompareMode::Double => "double",
        }
    }
}

impl From<CompareMode> for i32 {
    fn from(mode: CompareMode) -> Self {
        mode.depth()
    }
}

impl FromStr for CompareMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(CompareMode::Always),
            "deep" => Ok(CompareMode::Deep),
            "changed" => Ok(CompareMode::Changed),
            "shallow" => Ok(CompareMode::Shallow),
            "double" => Ok(CompareMode::Double),
            other => Err(Error::UnknownCompareMode(other.to_string())),
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Comparator
// =============================================================================

/// Compare two values with the given depth policy.
///
/// Pure and total: never panics, never fails. Identical values are equal at
/// every depth, values of different kinds are never equal.
///
/// Callers holding a depth ≤ [`DEPTH_ALWAYS`] must treat the value as changed
/// without calling this; see [`is_changed`].
pub fn are_equal(a: &Value, b: &Value, depth: i32) -> bool {
    if a.is_identical(b) {
        return true;
    }
    if depth == 0 {
        return false;
    }
    // One level consumed by this step.
    let next = depth.saturating_sub(1);
    match (a, b) {
        (Value::Seq(x), Value::Seq(y)) | (Value::Set(x), Value::Set(y)) => {
            // Sets compare positionally in insertion order, like sequences.
            x.len() == y.len()
                && x.iter().zip(y.iter()).all(|(l, r)| members_equal(l, r, next))
        }
        (Value::Mapping(x), Value::Mapping(y)) => {
            // Both are key-sorted, so zipping checks key sets and values together.
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && members_equal(va, vb, next))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x.iter().all(|(key, left)| {
                    y.iter()
                        .find(|(other, _)| other.is_identical(key))
                        .is_some_and(|(_, right)| members_equal(left, right, next))
                })
        }
        _ => false,
    }
}

/// Member comparison once a level has been consumed: identity when exhausted.
#[inline]
fn members_equal(a: &Value, b: &Value, depth: i32) -> bool {
    if depth == 0 {
        a.is_identical(b)
    } else {
        are_equal(a, b, depth)
    }
}

/// Change test honoring the "always" modes.
///
/// Returns true without comparing when `depth` ≤ [`DEPTH_ALWAYS`].
pub fn is_changed(previous: &Value, next: &Value, depth: i32) -> bool {
    depth <= DEPTH_ALWAYS || !are_equal(previous, next, depth)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(inner: i32) -> Value {
        Value::mapping([
            ("a", Value::from(1)),
            ("b", Value::mapping([("c", Value::from(inner))])),
        ])
    }

    #[test]
    fn test_reflexive_at_every_depth() {
        let values = [
            Value::Null,
            Value::from(true),
            Value::from(f64::NAN),
            Value::from("s"),
            nested(1),
            Value::seq([nested(2)]),
            Value::set([Value::from(1)]),
            Value::map([(Value::from(1), nested(3))]),
            Value::opaque(5u8),
        ];
        for v in &values {
            for depth in [-5, -2, -1, 0, 1, 2, 7] {
                assert!(are_equal(v, v, depth), "{v:?} at depth {depth}");
                assert!(are_equal(v, &v.clone(), depth));
            }
        }
    }

    #[test]
    fn test_depth_zero_is_identity() {
        let a = nested(1);
        let b = nested(1);
        assert!(!are_equal(&a, &b, 0));
        assert!(are_equal(&a, &a.clone(), 0));
        assert!(are_equal(&Value::from(3), &Value::from(3.0), 0));
        assert!(!are_equal(&Value::from(3), &Value::from(4), 0));
    }

    #[test]
    fn test_shallow_compares_members_by_identity() {
        let shared = Value::mapping([("deep", Value::from(1))]);
        let a = Value::mapping([("x", shared.clone()), ("y", Value::from(2))]);
        let b = Value::mapping([("x", shared), ("y", Value::from(2))]);
        assert!(are_equal(&a, &b, 1));

        // Same shape, but the nested mappings are different allocations.
        assert!(!are_equal(&nested(1), &nested(1), 1));
    }

    #[test]
    fn test_deep_compares_structure() {
        assert!(are_equal(&nested(1), &nested(1), -1));
        assert!(!are_equal(&nested(1), &nested(2), -1));

        let deep_a = Value::seq([Value::seq([Value::seq([nested(9)])])]);
        let deep_b = Value::seq([Value::seq([Value::seq([nested(9)])])]);
        assert!(are_equal(&deep_a, &deep_b, -1));
    }

    #[test]
    fn test_depth_two_descends_two_levels() {
        assert!(are_equal(&nested(1), &nested(1), 2));
        let a = Value::seq([Value::seq([nested(1)])]);
        let b = Value::seq([Value::seq([nested(1)])]);
        assert!(!are_equal(&a, &b, 3));
        // seq, seq, mapping, nested mapping.
        assert!(are_equal(&a, &b, 4));
    }

    #[test]
    fn test_kind_mismatch_is_unequal() {
        let seq = Value::seq([Value::from("a")]);
        let set = Value::set([Value::from("a")]);
        let mapping = Value::mapping([("0", Value::from("a"))]);
        for depth in [-1, 0, 1, 3] {
            assert!(!are_equal(&seq, &set, depth));
            assert!(!are_equal(&seq, &mapping, depth));
            assert!(!are_equal(&Value::from(1), &Value::from("1"), depth));
            assert!(!are_equal(&Value::Null, &Value::from(false), depth));
        }
    }

    #[test]
    fn test_mapping_key_sets_must_match() {
        let a = Value::mapping([("a", Value::from(1))]);
        let b = Value::mapping([("a", Value::from(1)), ("b", Value::Null)]);
        assert!(!are_equal(&a, &b, -1));
        assert!(!are_equal(&b, &a, -1));
    }

    #[test]
    fn test_sequence_length_and_order() {
        let a = Value::seq([Value::from(1), Value::from(2)]);
        let b = Value::seq([Value::from(2), Value::from(1)]);
        let c = Value::seq([Value::from(1)]);
        assert!(!are_equal(&a, &b, -1));
        assert!(!are_equal(&a, &c, -1));
    }

    #[test]
    fn test_set_compares_positionally() {
        let a = Value::set([Value::from(1), Value::from(2)]);
        let b = Value::set([Value::from(1), Value::from(2)]);
        let reordered = Value::set([Value::from(2), Value::from(1)]);
        assert!(are_equal(&a, &b, 1));
        assert!(!are_equal(&a, &reordered, 1));
    }

    #[test]
    fn test_map_ignores_insertion_order() {
        let a = Value::map([
            (Value::from("x"), Value::from(1)),
            (Value::from("y"), nested(2)),
        ]);
        let b = Value::map([
            (Value::from("y"), nested(2)),
            (Value::from("x"), Value::from(1)),
        ]);
        assert!(are_equal(&a, &b, -1));
        assert!(!are_equal(&a, &b, 1));

        let missing = Value::map([
            (Value::from("x"), Value::from(1)),
            (Value::from("z"), nested(2)),
        ]);
        assert!(!are_equal(&a, &missing, -1));
    }

    #[test]
    fn test_opaque_only_equal_to_itself() {
        let a = Value::opaque(1u32);
        let b = Value::opaque(1u32);
        assert!(!are_equal(&a, &b, -1));
        assert!(are_equal(&a, &a.clone(), -1));
    }

    #[test]
    fn test_is_changed_always_mode() {
        let v = nested(1);
        assert!(is_changed(&v, &v, CompareMode::Always.depth()));
        assert!(is_changed(&v, &v, -7));
        assert!(!is_changed(&v, &v, CompareMode::Changed.depth()));
        assert!(!is_changed(&nested(1), &nested(1), CompareMode::Deep.depth()));
    }

    #[test]
    fn test_compare_mode_names() {
        assert_eq!("shallow".parse::<CompareMode>().unwrap(), CompareMode::Shallow);
        assert_eq!(CompareMode::Double.depth(), 2);
        assert_eq!(i32::from(CompareMode::Always), -2);
        assert!(matches!(
            "sideways".parse::<CompareMode>(),
            Err(Error::UnknownCompareMode(name)) if name == "sideways"
        ));
        let mode: CompareMode = serde_json::from_str("\"deep\"").unwrap();
        assert_eq!(mode, CompareMode::Deep);
        assert_eq!(CompareMode::Changed.to_string(), "changed");
    }
}
