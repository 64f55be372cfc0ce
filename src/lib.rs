//! Tiered Object Cache
//!
//! A two-tier object cache for request-scoped application code, sitting in
//! front of a memcached-compatible store:
//! - **Local tier**: per-unit-of-work memo of every key touched, including
//!   memoized misses, so falsy values are distinguishable from "not found"
//! - **Remote tier**: memcached (or any [`RemoteCache`]) shared by every process
//! - **Group policy**: global groups shared across tenants, non-persistent
//!   groups that never leave the local tier
//! - **Flush generations**: mass invalidation by rotating a version counter
//!   embedded in every physical key, without wiping the remote store
//! - **Chunked multi-get**: large batches split into bounded round trips
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tiered_object_cache::{ObjectCacheSystemBuilder, backends::MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // One system per process
//!     let system = ObjectCacheSystemBuilder::new()
//!         .with_remote(Arc::new(MemoryStore::new()))
//!         .build()
//!         .await?;
//!
//!     // One object cache per request
//!     let mut cache = system.begin();
//!     cache.set("user:1", "alice", "users", None).await;
//!
//!     let lookup = cache.get("user:1", "users", false).await;
//!     assert!(lookup.found);
//!
//!     let stats = cache.finish();
//!     tracing::info!("Hit rate: {:.2}%", stats.hit_rate);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! (key, group) → GroupPolicy → KeyBuilder(+ flush generation) → LocalCache
//!                                                                 ↓ miss (persistent groups only)
//!                                                     RemoteCache (chunked for multi-get)
//!                                                                 ↓
//!                                                  memoized in LocalCache with found flag
//! ```

use std::sync::Arc;
use anyhow::Result;
use tracing::{info, warn};

pub mod backends;
pub mod batch;
pub mod builder;
pub mod codecs;
pub mod config;
pub mod error;
pub mod generations;
pub mod groups;
pub mod keys;
pub mod local_cache;
pub mod object_cache;
pub mod traits;
pub mod value;

pub use backends::MemoryStore;

// Optional backends (feature-gated)
#[cfg(feature = "backend-memcached")]
pub use backends::MemcachedStore;

pub use batch::BatchExecutor;
pub use builder::ObjectCacheSystemBuilder;
pub use codecs::JsonCodec;
#[cfg(feature = "postcard")]
pub use codecs::PostcardCodec;
pub use config::ObjectCacheConfig;
pub use error::{ConfigError, CounterError};
pub use generations::{FlushGenerationStore, Rotation};
pub use groups::{DEFAULT_GROUP, GroupPolicy};
pub use keys::{KeyBuilder, Scope};
pub use local_cache::LocalCache;
pub use object_cache::{FlushReport, ObjectCache, ObjectCacheStats};
pub use traits::{RemoteCache, ValueCodec};
pub use value::{CacheEntry, CacheValue, Lookup};

// Re-export async_trait for user convenience
pub use async_trait::async_trait;

/// Process-wide entry point
///
/// Holds the remote store, codec and configuration shared by every unit of
/// work, and hands out a fresh [`ObjectCache`] per unit of work.
///
/// # Example
///
/// ```rust,no_run
/// use tiered_object_cache::ObjectCacheSystem;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     // Connects to MEMCACHED_URL (default memcache://127.0.0.1:11211)
///     let system = ObjectCacheSystem::new().await?;
///
///     let mut cache = system.begin();
///     cache.add("greeting", "hello", "", None).await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ObjectCacheSystem {
    remote: Arc<dyn RemoteCache>,
    codec: Arc<dyn ValueCodec>,
    config: ObjectCacheConfig,
}

impl ObjectCacheSystem {
    /// Create a system backed by memcached, configured from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no remote
    /// backend can be created.
    pub async fn new() -> Result<Self> {
        ObjectCacheSystemBuilder::new()
            .with_config(ObjectCacheConfig::from_env()?)
            .build()
            .await
    }

    /// Create a system over an existing remote store with default settings
    pub fn with_remote(remote: Arc<dyn RemoteCache>) -> Self {
        Self::from_parts(remote, Arc::new(JsonCodec), ObjectCacheConfig::default())
    }

    pub(crate) fn from_parts(
        remote: Arc<dyn RemoteCache>,
        codec: Arc<dyn ValueCodec>,
        config: ObjectCacheConfig,
    ) -> Self {
        info!(
            backend = remote.name(),
            codec = codec.name(),
            batch_size = config.batch_size,
            "Object cache system ready"
        );
        Self {
            remote,
            codec,
            config,
        }
    }

    /// Start a unit of work
    ///
    /// The returned cache starts with an empty local tier and no memoized
    /// flush generations.
    pub fn begin(&self) -> ObjectCache {
        ObjectCache::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.codec),
            &self.config,
        )
    }

    /// Perform health check on the remote store
    ///
    /// The object cache keeps working without it (every read misses), so
    /// this is informational.
    pub async fn health_check(&self) -> bool {
        let healthy = self.remote.health_check().await;
        if healthy {
            info!(backend = self.remote.name(), "Object cache health check passed");
        } else {
            warn!(backend = self.remote.name(), "Object cache health check failed; running on the local tier only");
        }
        healthy
    }

    /// Wipe the entire remote store
    ///
    /// Unlike [`ObjectCache::flush`], this removes every key of every
    /// tenant and install sharing the store, bookkeeping included.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote store fails.
    pub async fn flush_remote(&self) -> Result<bool> {
        warn!(backend = self.remote.name(), "Wiping remote object cache store");
        self.remote.flush_all().await
    }

    pub fn config(&self) -> &ObjectCacheConfig {
        &self.config
    }

    pub fn remote(&self) -> &Arc<dyn RemoteCache> {
        &self.remote
    }
}
