//! Cache Values
//!
//! The closed set of payloads the object cache can hold, plus the
//! two-field read result returned by the `get` family.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value stored in the object cache
///
/// Every payload is one of these variants, which keeps integer checks for
/// `incr`/`decr` exhaustive: only [`CacheValue::Int`] is integer-like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    Sequence(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
}

impl CacheValue {
    /// The miss sentinel returned for lookups that found nothing
    pub const MISS: CacheValue = CacheValue::Bool(false);

    /// Integer payload, if this value is integer-like
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Short variant name, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Sequence(_) => "sequence",
            Self::Map(_) => "map",
        }
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for CacheValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for CacheValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<CacheValue>> for CacheValue {
    fn from(value: Vec<CacheValue>) -> Self {
        Self::Sequence(value)
    }
}

impl From<BTreeMap<String, CacheValue>> for CacheValue {
    fn from(value: BTreeMap<String, CacheValue>) -> Self {
        Self::Map(value)
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Entry held by the local tier
///
/// `found = false` marks a memoized miss; its value is always the miss
/// sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub found: bool,
}

impl CacheEntry {
    pub fn hit(value: CacheValue) -> Self {
        Self { value, found: true }
    }

    pub fn miss() -> Self {
        Self {
            value: CacheValue::MISS,
            found: false,
        }
    }
}

/// Result of a read: the value together with whether it was found
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub value: CacheValue,
    pub found: bool,
}

impl Lookup {
    pub fn hit(value: CacheValue) -> Self {
        Self { value, found: true }
    }

    pub fn miss() -> Self {
        Self {
            value: CacheValue::MISS,
            found: false,
        }
    }

    /// The value when found, `None` otherwise
    pub fn into_option(self) -> Option<CacheValue> {
        self.found.then_some(self.value)
    }
}

impl From<CacheEntry> for Lookup {
    fn from(entry: CacheEntry) -> Self {
        Self {
            value: entry.value,
            found: entry.found,
        }
    }
}
