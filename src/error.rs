//! Error types
//!
//! Most failures in the object cache are resolved into `false` or a miss.
//! The types here cover the cases where the caller needs to know why.

use thiserror::Error;

/// Why an `incr`/`decr` did not produce a new value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterError {
    /// The key does not exist in any reachable tier
    #[error("key '{key}' not found")]
    NotFound { key: String },

    /// The stored value is not an integer
    #[error("key '{key}' holds a {kind} value, not an integer")]
    NotInteger { key: String, kind: &'static str },

    /// The stored value or the result falls outside `0..=i64::MAX`,
    /// the range the remote store's native counters can represent
    #[error("key '{key}' cannot be adjusted: {value} is outside the counter range")]
    OutOfRange { key: String, value: i128 },

    /// The remote store rejected or failed the adjustment
    #[error("remote adjustment of key '{key}' failed: {reason}")]
    Unavailable { key: String, reason: String },
}

/// Invalid configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidVar { name: &'static str, value: String },

    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("max key length {0} is too short to hold a hashed key")]
    KeyLengthTooShort(usize),
}
