//! Remote Cache and Codec Traits
//!
//! This module defines the seams of the object cache: the remote store it
//! sits in front of, and the codec used to turn [`CacheValue`]s into bytes.
//!
//! # Architecture
//!
//! - `ValueCodec`: Trait for pluggable serialization backends
//! - `RemoteCache`: memcached-style primitives the coordinator relies on
//!
//! # Example: Custom Remote Backend
//!
//! ```rust,ignore
//! use tiered_object_cache::{RemoteCache, async_trait};
//! use std::collections::HashMap;
//! use std::time::Duration;
//! use anyhow::Result;
//!
//! struct MyStore {
//!     // Your implementation
//! }
//!
//! #[async_trait]
//! impl RemoteCache for MyStore {
//!     async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
//!         // Your implementation
//!     }
//!
//!     // ... add, set, replace, delete, increment, decrement, flush_all
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;

use crate::value::CacheValue;

/// Trait for cache value serialization/deserialization
///
/// Integers never reach the codec: the wire framing in
/// [`codecs`](crate::codecs) stores them as ASCII decimal so the remote
/// store can increment them natively. Codec output must therefore never
/// consist solely of ASCII digits.
///
/// # Example: Custom Codec
///
/// ```rust,ignore
/// use tiered_object_cache::{CacheValue, ValueCodec};
/// use anyhow::Result;
///
/// #[derive(Debug)]
/// struct MyCustomCodec;
///
/// impl ValueCodec for MyCustomCodec {
///     fn serialize(&self, value: &CacheValue) -> Result<Vec<u8>> {
///         Ok(mycodec::serialize(value)?)
///     }
///
///     fn deserialize(&self, bytes: &[u8]) -> Result<CacheValue> {
///         Ok(mycodec::deserialize(bytes)?)
///     }
///
///     fn name(&self) -> &'static str {
///         "mycodec"
///     }
/// }
/// ```
pub trait ValueCodec: Send + Sync + Debug {
    /// Serialize a value to bytes
    fn serialize(&self, value: &CacheValue) -> Result<Vec<u8>>;

    /// Deserialize bytes produced by [`ValueCodec::serialize`]
    fn deserialize(&self, bytes: &[u8]) -> Result<CacheValue>;

    /// Get the name of the codec, for logging
    fn name(&self) -> &'static str;
}

/// Remote key-value store with memcached semantics
///
/// Implementations report "not stored" and "not found" answers as
/// `Ok(false)` / `Ok(None)`, and reserve `Err` for failures of the store
/// itself (connection loss, timeouts, protocol errors). The object cache
/// treats every `Err` as a miss and never retries.
///
/// # Expirations
///
/// `None` means the entry never expires. Callers clamp expirations to the
/// store's relative limit before calling.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: one store is shared by every unit
/// of work in the process.
#[async_trait]
pub trait RemoteCache: Send + Sync {
    /// Get value by key
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - Value found
    /// * `Ok(None)` - Key not found or expired
    /// * `Err(e)` - Store unavailable
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Get several keys in one round trip
    ///
    /// The returned map contains only the keys that were found; misses are
    /// omitted rather than reported.
    async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>>;

    /// Store only if the key does not exist
    ///
    /// Returns `Ok(false)` when the key already exists.
    async fn add(&self, key: &str, value: &[u8], expiration: Option<Duration>) -> Result<bool>;

    /// Store unconditionally
    async fn set(&self, key: &str, value: &[u8], expiration: Option<Duration>) -> Result<bool>;

    /// Store only if the key already exists
    ///
    /// Returns `Ok(false)` when the key does not exist.
    async fn replace(&self, key: &str, value: &[u8], expiration: Option<Duration>)
        -> Result<bool>;

    /// Delete a key
    ///
    /// Returns `Ok(false)` when the key did not exist.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Atomically add `delta` to an ASCII-decimal value
    ///
    /// # Returns
    ///
    /// * `Ok(Some(n))` - The new value
    /// * `Ok(None)` - Key not found
    /// * `Err(e)` - Stored value is not numeric, or the store failed
    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>>;

    /// Atomically subtract `delta`, flooring at zero
    ///
    /// Same return contract as [`RemoteCache::increment`].
    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>>;

    /// Wipe every key in the store
    async fn flush_all(&self) -> Result<bool>;

    /// Check if the store is reachable and answering
    async fn health_check(&self) -> bool;

    /// Get the name of this backend, for logging
    fn name(&self) -> &'static str {
        "unknown"
    }
}
