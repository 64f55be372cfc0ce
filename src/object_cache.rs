//! Object Cache - Unit-of-Work Coordinator
//!
//! Implements the read/write primitives on top of the local tier and the
//! remote store, with group policy, tenant scoping and flush generations
//! folded into every physical key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::batch::BatchExecutor;
use crate::codecs;
use crate::config::ObjectCacheConfig;
use crate::error::CounterError;
use crate::generations::{FlushGenerationStore, Rotation};
use crate::groups::GroupPolicy;
use crate::keys::{KeyBuilder, Scope};
use crate::local_cache::LocalCache;
use crate::traits::{RemoteCache, ValueCodec};
use crate::value::{CacheEntry, CacheValue, Lookup};

/// A logical key resolved for the current scope and generation
struct Resolved {
    physical: String,
    persistent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adjustment {
    Increment,
    Decrement,
}

impl Adjustment {
    /// Exact result of applying `offset` to `current`, before range checks
    fn apply(self, current: i64, offset: u64) -> i128 {
        let (current, offset) = (i128::from(current), i128::from(offset));
        match self {
            Self::Increment => current + offset,
            Self::Decrement => (current - offset).max(0),
        }
    }
}

/// Counter values the remote store can hold natively
fn in_counter_range(value: i128) -> Option<i64> {
    i64::try_from(value).ok().filter(|n| *n >= 0)
}

/// Outcome of [`ObjectCache::flush`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Rotation of the current tenant's generation
    pub blog: Rotation,
    /// Rotation of the global generation
    pub global: Rotation,
}

impl FlushReport {
    /// Whether both rotations reached the remote store
    pub fn is_persisted(&self) -> bool {
        self.blog.is_persisted() && self.global.is_persisted()
    }
}

/// Object cache statistics for one unit of work
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectCacheStats {
    pub local_hits: u64,
    pub remote_hits: u64,
    pub misses: u64,
    /// Round trips issued to the remote store
    pub remote_calls: u64,
    /// Remote calls that failed and were treated as misses
    pub remote_failures: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct Counters {
    local_hits: u64,
    remote_hits: u64,
    misses: u64,
    remote_calls: u64,
    remote_failures: u64,
}

/// Two-tier object cache for one unit of work
///
/// Created by [`ObjectCacheSystem::begin`](crate::ObjectCacheSystem::begin)
/// and owned by a single task: every method takes `&mut self` and awaits
/// its remote calls before returning. Failures never surface as errors
/// (except the typed [`CounterError`] of `incr`/`decr`); a failing remote
/// store degrades every operation to a miss or `false`.
///
/// An empty group name means the `default` group.
pub struct ObjectCache {
    remote: Arc<dyn RemoteCache>,
    codec: Arc<dyn ValueCodec>,
    keys: KeyBuilder,
    generations: FlushGenerationStore,
    groups: GroupPolicy,
    local: LocalCache,
    batch: BatchExecutor,
    blog_id: u64,
    default_expiration: Option<Duration>,
    max_expiration: Duration,
    counters: Counters,
}

impl ObjectCache {
    /// Start a unit of work against `remote`
    pub fn new(
        remote: Arc<dyn RemoteCache>,
        codec: Arc<dyn ValueCodec>,
        config: &ObjectCacheConfig,
    ) -> Self {
        let keys = KeyBuilder::new(config.key_salt.clone(), config.max_key_length);
        let mut groups = GroupPolicy::new();
        groups.add_global(config.global_groups.iter().cloned());
        groups.add_non_persistent(config.non_persistent_groups.iter().cloned());

        debug!(
            backend = remote.name(),
            codec = codec.name(),
            blog_id = config.blog_id,
            "Starting object cache unit of work"
        );

        Self {
            generations: FlushGenerationStore::new(
                Arc::clone(&remote),
                Arc::clone(&codec),
                keys.clone(),
            ),
            remote,
            codec,
            keys,
            groups,
            local: LocalCache::new(),
            batch: BatchExecutor::new(config.batch_size),
            blog_id: config.blog_id,
            default_expiration: config.default_expiration,
            max_expiration: config.max_expiration,
            counters: Counters::default(),
        }
    }

    // ===== Single-key primitives =====

    /// Store `value` only if the key does not exist yet
    ///
    /// Returns `false` if the key is already present in either tier, or
    /// the remote store could not be reached.
    pub async fn add(
        &mut self,
        key: &str,
        value: impl Into<CacheValue>,
        group: &str,
        expire: Option<Duration>,
    ) -> bool {
        let value = value.into();
        let resolved = self.resolve(key, group).await;
        if self.local.contains_value(&resolved.physical) {
            return false;
        }
        if !resolved.persistent {
            self.local.put(resolved.physical, CacheEntry::hit(value));
            return true;
        }

        let Some(bytes) = self.encode(&resolved.physical, &value) else {
            return false;
        };
        let ttl = self.expiration(expire);
        self.counters.remote_calls += 1;
        match self.remote.add(&resolved.physical, &bytes, ttl).await {
            Ok(true) => {
                self.local.put(resolved.physical, CacheEntry::hit(value));
                true
            }
            Ok(false) => {
                // A memoized miss for this key is stale now.
                self.local.forget(&resolved.physical);
                false
            }
            Err(e) => {
                self.remote_failed("add", &resolved.physical, &e);
                false
            }
        }
    }

    /// Store `value` unconditionally
    ///
    /// Returns `false` only when a persistent group's value cannot be
    /// encoded (e.g. a NaN float) or the remote write fails.
    pub async fn set(
        &mut self,
        key: &str,
        value: impl Into<CacheValue>,
        group: &str,
        expire: Option<Duration>,
    ) -> bool {
        let value = value.into();
        let resolved = self.resolve(key, group).await;
        if !resolved.persistent {
            self.local.put(resolved.physical, CacheEntry::hit(value));
            return true;
        }

        let Some(bytes) = self.encode(&resolved.physical, &value) else {
            return false;
        };
        self.local
            .put(resolved.physical.clone(), CacheEntry::hit(value));
        let ttl = self.expiration(expire);
        self.counters.remote_calls += 1;
        match self.remote.set(&resolved.physical, &bytes, ttl).await {
            Ok(stored) => stored,
            Err(e) => {
                self.remote_failed("set", &resolved.physical, &e);
                false
            }
        }
    }

    /// Overwrite `value` only if the key already exists remotely
    ///
    /// Non-persistent groups have no remote copy to check, so replace
    /// always succeeds there.
    pub async fn replace(
        &mut self,
        key: &str,
        value: impl Into<CacheValue>,
        group: &str,
        expire: Option<Duration>,
    ) -> bool {
        let value = value.into();
        let resolved = self.resolve(key, group).await;
        if !resolved.persistent {
            self.local.put(resolved.physical, CacheEntry::hit(value));
            return true;
        }

        let Some(bytes) = self.encode(&resolved.physical, &value) else {
            return false;
        };
        let ttl = self.expiration(expire);
        self.counters.remote_calls += 1;
        match self.remote.replace(&resolved.physical, &bytes, ttl).await {
            Ok(true) => {
                self.local.put(resolved.physical, CacheEntry::hit(value));
                true
            }
            Ok(false) => {
                self.local.forget(&resolved.physical);
                false
            }
            Err(e) => {
                self.remote_failed("replace", &resolved.physical, &e);
                false
            }
        }
    }

    /// Read a key, local tier first
    ///
    /// `force` skips the local tier and re-reads the remote store (it has no
    /// effect on non-persistent groups). Every miss is memoized so repeated
    /// reads in this unit of work do not go back to the remote store.
    ///
    /// Non-persistent groups always report `found = false`, even for values
    /// set earlier in this unit of work.
    pub async fn get(&mut self, key: &str, group: &str, force: bool) -> Lookup {
        let resolved = self.resolve(key, group).await;
        if !force || !resolved.persistent {
            if let Some(entry) = self.local.get(&resolved.physical) {
                let entry = entry.clone();
                return self.report_local(entry, resolved.persistent);
            }
        }
        if !resolved.persistent {
            self.counters.misses += 1;
            self.local.put(resolved.physical, CacheEntry::miss());
            return Lookup::miss();
        }

        self.counters.remote_calls += 1;
        let fetched = match self.remote.get(&resolved.physical).await {
            Ok(Some(bytes)) => self.decode(&resolved.physical, &bytes),
            Ok(None) => None,
            Err(e) => {
                self.remote_failed("get", &resolved.physical, &e);
                None
            }
        };
        self.remember(resolved.physical, fetched)
    }

    /// Remove a key from the local tier and, for persistent groups, the remote store
    ///
    /// Returns whether the key existed in the tier that owns it.
    pub async fn delete(&mut self, key: &str, group: &str) -> bool {
        let resolved = self.resolve(key, group).await;
        let existed_locally = self
            .local
            .forget(&resolved.physical)
            .is_some_and(|entry| entry.found);
        if !resolved.persistent {
            return existed_locally;
        }

        self.counters.remote_calls += 1;
        match self.remote.delete(&resolved.physical).await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.remote_failed("delete", &resolved.physical, &e);
                false
            }
        }
    }

    /// Add `offset` to an integer value
    ///
    /// # Errors
    ///
    /// [`CounterError::NotFound`] if the key is absent,
    /// [`CounterError::NotInteger`] if it holds anything but an integer,
    /// [`CounterError::OutOfRange`] if the stored value is negative or the
    /// result would exceed `i64::MAX` (the remote counter is left unchanged),
    /// [`CounterError::Unavailable`] if the remote store failed.
    pub async fn incr(&mut self, key: &str, offset: u64, group: &str) -> Result<i64, CounterError> {
        self.adjust(key, offset, group, Adjustment::Increment).await
    }

    /// Subtract `offset` from an integer value, flooring at zero
    ///
    /// # Errors
    ///
    /// Same as [`ObjectCache::incr`].
    pub async fn decr(&mut self, key: &str, offset: u64, group: &str) -> Result<i64, CounterError> {
        self.adjust(key, offset, group, Adjustment::Decrement).await
    }

    // ===== Multi-key primitives =====

    /// [`ObjectCache::add`] for each item, reported per key
    pub async fn add_multiple<I, K, V>(
        &mut self,
        items: I,
        group: &str,
        expire: Option<Duration>,
    ) -> HashMap<String, bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CacheValue>,
    {
        let mut results = HashMap::new();
        for (key, value) in items {
            let key = key.into();
            let added = self.add(&key, value, group, expire).await;
            results.insert(key, added);
        }
        results
    }

    /// [`ObjectCache::set`] for each item, reported per key
    pub async fn set_multiple<I, K, V>(
        &mut self,
        items: I,
        group: &str,
        expire: Option<Duration>,
    ) -> HashMap<String, bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CacheValue>,
    {
        let mut results = HashMap::new();
        for (key, value) in items {
            let key = key.into();
            let stored = self.set(&key, value, group, expire).await;
            results.insert(key, stored);
        }
        results
    }

    /// [`ObjectCache::delete`] for each key, reported per key
    pub async fn delete_multiple<I, K>(&mut self, keys: I, group: &str) -> HashMap<String, bool>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut results = HashMap::new();
        for key in keys {
            let key = key.as_ref();
            let deleted = self.delete(key, group).await;
            results.insert(key.to_owned(), deleted);
        }
        results
    }

    /// Read several keys of one group
    ///
    /// Keys not answered by the local tier are fetched through the
    /// [`BatchExecutor`] in bounded chunks. The result holds every requested
    /// key; absent keys map to the miss sentinel.
    pub async fn get_multiple<I, K>(&mut self, keys: I, group: &str, force: bool) -> HashMap<String, Lookup>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut results = HashMap::new();
        let mut pending: Vec<(String, String)> = Vec::new();

        for key in keys {
            let key = key.as_ref();
            let resolved = self.resolve(key, group).await;
            if !force || !resolved.persistent {
                if let Some(entry) = self.local.get(&resolved.physical) {
                    let entry = entry.clone();
                    let lookup = self.report_local(entry, resolved.persistent);
                    results.insert(key.to_owned(), lookup);
                    continue;
                }
            }
            if resolved.persistent {
                pending.push((key.to_owned(), resolved.physical));
            } else {
                self.counters.misses += 1;
                self.local.put(resolved.physical, CacheEntry::miss());
                results.insert(key.to_owned(), Lookup::miss());
            }
        }

        if pending.is_empty() {
            return results;
        }

        let physical: Vec<String> = pending.iter().map(|(_, physical)| physical.clone()).collect();
        let mut batch = self.batch.get_multi(self.remote.as_ref(), &physical).await;
        self.counters.remote_calls += batch.round_trips as u64;
        self.counters.remote_failures += batch.failed_chunks as u64;

        for (key, physical) in pending {
            let fetched = match batch.values.remove(&physical) {
                Some(Some(bytes)) => self.decode(&physical, &bytes),
                // Duplicate keys share one fetched value; the first copy
                // already landed in the local tier.
                None => self.local.get(&physical).filter(|entry| entry.found).map(|entry| entry.value.clone()),
                Some(None) => None,
            };
            let lookup = self.remember(physical, fetched);
            results.insert(key, lookup);
        }
        results
    }

    // ===== Flush and scope =====

    /// Invalidate every persistent key of the current tenant and of all
    /// global groups, and clear the local tier
    ///
    /// The remote store is never wiped: the tenant and global generations
    /// are rotated, which makes every older physical key unreachable.
    pub async fn flush(&mut self) -> FlushReport {
        let blog = self.generations.rotate(Scope::Blog(self.blog_id)).await;
        let global = self.generations.rotate(Scope::Global).await;
        self.local.clear();

        let report = FlushReport { blog, global };
        if report.is_persisted() {
            info!(blog_id = self.blog_id, "Object cache flushed");
        } else {
            warn!(blog_id = self.blog_id, "Object cache flushed for this unit of work only; remote generation write failed");
        }
        report
    }

    /// Forget everything cached in this unit of work
    ///
    /// Clears the local tier and the memoized generations. Nothing is
    /// invalidated remotely: persistent values stay reachable.
    pub fn flush_runtime(&mut self) {
        self.local.clear();
        self.generations.forget();
        debug!("Object cache runtime flushed");
    }

    /// Switch the tenant scope
    ///
    /// Local entries of the previous tenant stay in memory but are no
    /// longer reachable, because their physical keys carry the old scope.
    pub fn switch_to_blog(&mut self, blog_id: u64) {
        if blog_id != self.blog_id {
            debug!(from = self.blog_id, to = blog_id, "Switching blog scope");
        }
        self.blog_id = blog_id;
    }

    pub fn blog_id(&self) -> u64 {
        self.blog_id
    }

    /// Register groups shared across tenants (pass a single name as `["name"]`)
    pub fn add_global_groups<I, S>(&mut self, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.add_global(groups);
    }

    /// Register groups that never leave the local tier
    pub fn add_non_persistent_groups<I, S>(&mut self, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.add_non_persistent(groups);
    }

    pub fn groups(&self) -> &GroupPolicy {
        &self.groups
    }

    /// Physical key a logical key currently resolves to
    pub async fn key(&mut self, key: &str, group: &str) -> String {
        self.resolve(key, group).await.physical
    }

    // ===== Statistics and lifecycle =====

    pub fn get_stats(&self) -> ObjectCacheStats {
        let c = &self.counters;
        let lookups = c.local_hits + c.remote_hits + c.misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups > 0 {
            ((c.local_hits + c.remote_hits) as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };
        ObjectCacheStats {
            local_hits: c.local_hits,
            remote_hits: c.remote_hits,
            misses: c.misses,
            remote_calls: c.remote_calls,
            remote_failures: c.remote_failures,
            hit_rate,
        }
    }

    /// Number of entries in the local tier, memoized misses included
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    /// End the unit of work, discarding the local tier
    pub fn finish(self) -> ObjectCacheStats {
        let stats = self.get_stats();
        debug!(
            local_hits = stats.local_hits,
            remote_hits = stats.remote_hits,
            misses = stats.misses,
            remote_calls = stats.remote_calls,
            "Object cache unit of work finished"
        );
        stats
    }

    // ===== Internals =====

    async fn resolve(&mut self, key: &str, group: &str) -> Resolved {
        let group = GroupPolicy::normalize(group);
        let scope = if self.groups.is_global(group) {
            Scope::Global
        } else {
            Scope::Blog(self.blog_id)
        };
        let persistent = self.groups.is_persistent(group);

        // Non-persistent groups never touch the remote store, not even for
        // their generation; flush clears them locally instead.
        let physical = if GroupPolicy::is_exempt(group) || !persistent {
            self.keys.build_fixed(scope, group, key)
        } else {
            let generation = self.generations.current(scope).await;
            self.keys.build(scope, generation, group, key)
        };
        Resolved {
            physical,
            persistent,
        }
    }

    async fn adjust(
        &mut self,
        key: &str,
        offset: u64,
        group: &str,
        adjustment: Adjustment,
    ) -> Result<i64, CounterError> {
        let resolved = self.resolve(key, group).await;
        let local = self
            .local
            .get(&resolved.physical)
            .filter(|entry| entry.found)
            .map(|entry| entry.value.clone());
        let local_int = match &local {
            Some(value) => match value.as_int() {
                Some(current) => Some(checked_adjustment(key, current, offset, adjustment)?),
                None => return Err(not_integer(key, value)),
            },
            None => None,
        };

        if !resolved.persistent {
            let Some(next) = local_int else {
                return Err(CounterError::NotFound { key: key.to_owned() });
            };
            self.local
                .put(resolved.physical, CacheEntry::hit(CacheValue::Int(next)));
            return Ok(next);
        }
        if adjustment == Adjustment::Increment && in_counter_range(i128::from(offset)).is_none() {
            return Err(out_of_range(key, i128::from(offset)));
        }

        self.counters.remote_calls += 1;
        let outcome = match adjustment {
            Adjustment::Increment => self.remote.increment(&resolved.physical, offset).await,
            Adjustment::Decrement => self.remote.decrement(&resolved.physical, offset).await,
        };
        match outcome {
            Ok(Some(n)) => match in_counter_range(i128::from(n)) {
                Some(next) => {
                    self.local
                        .put(resolved.physical, CacheEntry::hit(CacheValue::Int(next)));
                    Ok(next)
                }
                None => {
                    self.undo_overflow(&resolved.physical, offset).await;
                    Err(out_of_range(key, i128::from(n)))
                }
            },
            Ok(None) => {
                self.local.put(resolved.physical, CacheEntry::miss());
                Err(CounterError::NotFound { key: key.to_owned() })
            }
            Err(e) => {
                // The store refuses non-numeric values the same way it
                // reports outages; look at the value to tell them apart.
                self.counters.remote_calls += 1;
                let stored = match self.remote.get(&resolved.physical).await {
                    Ok(Some(bytes)) => self.decode(&resolved.physical, &bytes),
                    _ => None,
                };
                match stored {
                    Some(value) if value.as_int().is_none_or(|n| n < 0) => {
                        let error = match value.as_int() {
                            Some(current) => out_of_range(key, i128::from(current)),
                            None => not_integer(key, &value),
                        };
                        self.local.put(resolved.physical, CacheEntry::hit(value));
                        Err(error)
                    }
                    _ => {
                        self.remote_failed("incr/decr", &resolved.physical, &e);
                        Err(CounterError::Unavailable {
                            key: key.to_owned(),
                            reason: e.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Take back an increment that pushed a counter past `i64::MAX`
    ///
    /// Leaves the remote value readable as an integer again.
    async fn undo_overflow(&mut self, physical: &str, offset: u64) {
        self.counters.remote_calls += 1;
        match self.remote.decrement(physical, offset).await {
            Ok(Some(n)) => match in_counter_range(i128::from(n)) {
                Some(restored) => {
                    self.local
                        .put(physical.to_owned(), CacheEntry::hit(CacheValue::Int(restored)));
                }
                None => {
                    self.local.forget(physical);
                }
            },
            Ok(None) => {
                self.local.forget(physical);
            }
            Err(e) => {
                self.local.forget(physical);
                self.remote_failed("decr", physical, &e);
            }
        }
    }

    /// Answer from a local entry, applying the non-persistent found convention
    fn report_local(&mut self, entry: CacheEntry, persistent: bool) -> Lookup {
        if entry.found {
            self.counters.local_hits += 1;
        } else {
            self.counters.misses += 1;
        }
        let mut lookup = Lookup::from(entry);
        if !persistent {
            lookup.found = false;
        }
        lookup
    }

    /// Memoize a remote answer in the local tier
    fn remember(&mut self, physical: String, fetched: Option<CacheValue>) -> Lookup {
        match fetched {
            Some(value) => {
                self.counters.remote_hits += 1;
                self.local.put(physical, CacheEntry::hit(value.clone()));
                Lookup::hit(value)
            }
            None => {
                self.counters.misses += 1;
                self.local.put(physical, CacheEntry::miss());
                Lookup::miss()
            }
        }
    }

    fn encode(&self, physical: &str, value: &CacheValue) -> Option<Vec<u8>> {
        match codecs::encode(self.codec.as_ref(), value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(key = %physical, codec = self.codec.name(), error = %e, "Failed to encode cache value");
                None
            }
        }
    }

    fn decode(&self, physical: &str, bytes: &[u8]) -> Option<CacheValue> {
        match codecs::decode(self.codec.as_ref(), bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %physical, codec = self.codec.name(), error = %e, "Failed to decode cached value; treating as miss");
                None
            }
        }
    }

    fn expiration(&self, expire: Option<Duration>) -> Option<Duration> {
        expire
            .or(self.default_expiration)
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| ttl.min(self.max_expiration))
    }

    fn remote_failed(&mut self, command: &str, physical: &str, error: &anyhow::Error) {
        self.counters.remote_failures += 1;
        warn!(command, key = %physical, backend = self.remote.name(), error = %error, "Remote cache call failed; treating as miss");
    }
}

/// Apply an adjustment to a locally known integer, within the counter range
fn checked_adjustment(
    key: &str,
    current: i64,
    offset: u64,
    adjustment: Adjustment,
) -> Result<i64, CounterError> {
    if current < 0 {
        return Err(out_of_range(key, i128::from(current)));
    }
    let next = adjustment.apply(current, offset);
    in_counter_range(next).ok_or_else(|| out_of_range(key, next))
}

fn out_of_range(key: &str, value: i128) -> CounterError {
    warn!(key = %key, value = %value, "incr/decr outside the counter range");
    CounterError::OutOfRange {
        key: key.to_owned(),
        value,
    }
}

fn not_integer(key: &str, value: &CacheValue) -> CounterError {
    warn!(key = %key, kind = value.kind(), "incr/decr on a non-integer value");
    CounterError::NotInteger {
        key: key.to_owned(),
        kind: value.kind(),
    }
}
