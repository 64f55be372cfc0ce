//! Memory Store - In-Process Remote Backend
//!
//! A `DashMap`-backed store that follows memcached's command semantics.
//! One instance shared through `Arc` behaves like a remote cache seen by
//! several units of work, which makes it the backend of choice for tests,
//! demos and single-process deployments.

use anyhow::{Result, bail};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Stored bytes with expiration tracking
#[derive(Debug, Clone)]
struct StoredValue {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_vec(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() > expires_at)
    }
}

/// In-process store with memcached semantics
///
/// **Features**:
/// - `add`/`replace` preconditions checked atomically per key
/// - `increment`/`decrement` on ASCII-decimal values, decrement floored at zero
/// - Per-key expiration, evicted lazily on access
/// - An availability switch to simulate an unreachable server
///
/// **Example**:
/// ```rust
/// use tiered_object_cache::backends::MemoryStore;
/// use tiered_object_cache::RemoteCache;
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = MemoryStore::new();
/// assert!(store.add("counter", b"1", None).await?);
/// assert!(!store.add("counter", b"5", None).await?);
/// assert_eq!(store.increment("counter", 2).await?, Some(3));
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    /// Concurrent `HashMap`
    map: Arc<DashMap<String, StoredValue>>,
    /// When false every command fails as if the server were down
    available: AtomicBool,
    /// Write counter
    writes: AtomicU64,
    /// Number of `get_multi` round trips served
    multi_gets: AtomicU64,
}

impl MemoryStore {
    /// Create new empty store
    pub fn new() -> Self {
        info!("Initializing Memory Store (DashMap)");

        Self {
            map: Arc::new(DashMap::new()),
            available: AtomicBool::new(true),
            writes: AtomicU64::new(0),
            multi_gets: AtomicU64::new(0),
        }
    }

    /// Make every subsequent command fail (`false`) or succeed again (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Read raw bytes, bypassing the availability switch and counters
    pub fn raw_get(&self, key: &str) -> Option<Vec<u8>> {
        self.map
            .get(key)
            .filter(|stored| !stored.is_expired())
            .map(|stored| stored.value.clone())
    }

    /// Number of `get_multi` calls served so far
    pub fn multi_get_calls(&self) -> u64 {
        self.multi_gets.load(Ordering::Relaxed)
    }

    /// Number of successful writes (add/set/replace/incr/decr) so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Get current number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            bail!("memory store is unavailable")
        }
    }

    fn read(&self, key: &str) -> Option<Vec<u8>> {
        match self.map.get(key) {
            Some(stored) if stored.is_expired() => {
                drop(stored); // Release read lock
                self.map.remove(key);
                None
            }
            Some(stored) => Some(stored.value.clone()),
            None => None,
        }
    }

    fn store_if(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
        want_existing: Option<bool>,
    ) -> bool {
        let stored = match self.map.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let live = !occupied.get().is_expired();
                if want_existing == Some(false) && live || want_existing == Some(true) && !live {
                    false
                } else {
                    occupied.insert(StoredValue::new(value, ttl));
                    true
                }
            }
            Entry::Vacant(vacant) => {
                if want_existing == Some(true) {
                    false
                } else {
                    vacant.insert(StoredValue::new(value, ttl));
                    true
                }
            }
        };
        if stored {
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
        stored
    }

    fn adjust(&self, key: &str, apply: impl FnOnce(u64) -> u64) -> Result<Option<u64>> {
        let Some(mut stored) = self.map.get_mut(key) else {
            return Ok(None);
        };
        if stored.is_expired() {
            drop(stored);
            self.map.remove(key);
            return Ok(None);
        }
        let current: u64 = match std::str::from_utf8(&stored.value)
            .ok()
            .and_then(|text| text.trim_end().parse().ok())
        {
            Some(n) => n,
            None => bail!("cannot increment or decrement non-numeric value"),
        };
        let next = apply(current);
        stored.value = next.to_string().into_bytes();
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(Some(next))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Trait Implementations =====

use crate::traits::RemoteCache;
use async_trait::async_trait;

/// Implement `RemoteCache` trait for `MemoryStore`
#[async_trait]
impl RemoteCache for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_available()?;
        Ok(self.read(key))
    }

    async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>> {
        self.ensure_available()?;
        self.multi_gets.fetch_add(1, Ordering::Relaxed);
        Ok(keys
            .iter()
            .filter_map(|key| self.read(key).map(|value| ((*key).to_owned(), value)))
            .collect())
    }

    async fn add(&self, key: &str, value: &[u8], expiration: Option<Duration>) -> Result<bool> {
        self.ensure_available()?;
        Ok(self.store_if(key, value, expiration, Some(false)))
    }

    async fn set(&self, key: &str, value: &[u8], expiration: Option<Duration>) -> Result<bool> {
        self.ensure_available()?;
        Ok(self.store_if(key, value, expiration, None))
    }

    async fn replace(
        &self,
        key: &str,
        value: &[u8],
        expiration: Option<Duration>,
    ) -> Result<bool> {
        self.ensure_available()?;
        Ok(self.store_if(key, value, expiration, Some(true)))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_available()?;
        Ok(self
            .map
            .remove(key)
            .is_some_and(|(_, stored)| !stored.is_expired()))
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.ensure_available()?;
        // memcached wraps around at 2^64
        self.adjust(key, |current| current.wrapping_add(delta))
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>> {
        self.ensure_available()?;
        self.adjust(key, |current| current.saturating_sub(delta))
    }

    async fn flush_all(&self) -> Result<bool> {
        self.ensure_available()?;
        self.map.clear();
        Ok(true)
    }

    async fn health_check(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn name(&self) -> &'static str {
        "MemoryStore"
    }
}
