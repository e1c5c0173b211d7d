//! Crate error type.
//!
//! The core is almost infallible: equality is total, scheduling never fails and
//! unknown settings keys are ignored. Errors only come from parsing named
//! compare modes and settings documents.

use thiserror::Error;

/// Errors produced by spark-dom.
#[derive(Debug, Error)]
pub enum Error {
    /// A compare mode name outside the fixed name table.
    #[error("unknown compare mode `{0}` (expected always, deep, changed, shallow or double)")]
    UnknownCompareMode(String),

    /// A settings document that is not valid JSON or has mistyped values.
    #[error("invalid host settings: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
