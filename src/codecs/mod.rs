//! Cache Codec Implementations
//!
//! This module provides built-in implementations of the [`ValueCodec`](crate::traits::ValueCodec) trait
//! for different serialization backends, and the wire framing that sits on
//! top of them.
//!
//! # Wire framing
//!
//! [`CacheValue::Int`] is written as bare ASCII decimal (`42`, `-7`) so
//! memcached's `incr`/`decr` can operate on it. Every other variant is
//! handed to the codec. Neither built-in codec ever emits an all-digit
//! payload, so [`decode`] can tell the two apart by looking at the bytes.

use anyhow::{Result, bail};

use crate::traits::ValueCodec;
use crate::value::CacheValue;

mod json;
pub use json::JsonCodec;

#[cfg(feature = "postcard")]
mod postcard;
#[cfg(feature = "postcard")]
#[cfg_attr(docsrs, doc(cfg(feature = "postcard")))]
pub use self::postcard::PostcardCodec;

/// Encode a value for the remote store
///
/// # Errors
///
/// Returns an error if the codec cannot serialize the value.
pub fn encode(codec: &dyn ValueCodec, value: &CacheValue) -> Result<Vec<u8>> {
    if has_non_finite(value) {
        bail!("non-finite floats cannot be stored");
    }
    match value {
        CacheValue::Int(n) => Ok(n.to_string().into_bytes()),
        other => codec.serialize(other),
    }
}

/// NaN and infinities do not survive every codec (JSON writes them as `null`)
fn has_non_finite(value: &CacheValue) -> bool {
    match value {
        CacheValue::Float(f) => !f.is_finite(),
        CacheValue::Sequence(items) => items.iter().any(has_non_finite),
        CacheValue::Map(map) => map.values().any(has_non_finite),
        _ => false,
    }
}

/// Decode bytes read from the remote store
///
/// # Errors
///
/// Returns an error if the bytes are neither an ASCII integer nor a valid
/// codec payload.
pub fn decode(codec: &dyn ValueCodec, bytes: &[u8]) -> Result<CacheValue> {
    if let Some(n) = parse_ascii_int(bytes) {
        return Ok(CacheValue::Int(n));
    }
    codec.deserialize(bytes)
}

/// Parse memcached's numeric representation (digits, optional leading `-`,
/// trailing spaces left behind by `decr`)
fn parse_ascii_int(bytes: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(bytes).ok()?.trim_end();
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
