//! Object Cache System Builder
//!
//! Provides a builder pattern for constructing [`ObjectCacheSystem`] with a
//! custom remote store, codec and configuration.
//!
//! # Example: Default Backend
//!
//! ```rust,no_run
//! use tiered_object_cache::ObjectCacheSystemBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Memcached from MEMCACHED_URL
//!     let system = ObjectCacheSystemBuilder::new()
//!         .build()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Example: Custom Remote Store
//!
//! ```rust,ignore
//! use tiered_object_cache::{ObjectCacheSystemBuilder, ObjectCacheConfig};
//! use std::sync::Arc;
//!
//! let system = ObjectCacheSystemBuilder::new()
//!     .with_remote(Arc::new(MyStore::new()))
//!     .with_config(ObjectCacheConfig {
//!         global_groups: vec!["users".into()],
//!         ..ObjectCacheConfig::default()
//!     })
//!     .build()
//!     .await?;
//! ```

use std::sync::Arc;
use anyhow::Result;
use tracing::info;

use crate::codecs::JsonCodec;
use crate::config::ObjectCacheConfig;
use crate::traits::{RemoteCache, ValueCodec};
use crate::ObjectCacheSystem;

/// Builder for constructing `ObjectCacheSystem`
///
/// # Default Behavior
///
/// - **Remote**: memcached from `MEMCACHED_URL` (requires feature `memcached`)
/// - **Codec**: `serde_json`
/// - **Config**: [`ObjectCacheConfig::default`]
pub struct ObjectCacheSystemBuilder {
    remote: Option<Arc<dyn RemoteCache>>,
    codec: Option<Arc<dyn ValueCodec>>,
    config: ObjectCacheConfig,
}

impl ObjectCacheSystemBuilder {
    /// Create a new builder with nothing configured
    pub fn new() -> Self {
        Self {
            remote: None,
            codec: None,
            config: ObjectCacheConfig::default(),
        }
    }

    /// Use a specific remote store
    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteCache>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Use a specific value codec
    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: ObjectCacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the `ObjectCacheSystem`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or no remote store
    /// was given and the default one cannot be created.
    pub async fn build(self) -> Result<ObjectCacheSystem> {
        self.config.validate()?;

        let remote = match self.remote {
            Some(remote) => {
                info!(backend = remote.name(), "Using custom remote backend");
                remote
            }
            None => default_remote().await?,
        };
        let codec: Arc<dyn ValueCodec> = match self.codec {
            Some(codec) => codec,
            None => Arc::new(JsonCodec),
        };

        Ok(ObjectCacheSystem::from_parts(remote, codec, self.config))
    }
}

impl Default for ObjectCacheSystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "backend-memcached")]
async fn default_remote() -> Result<Arc<dyn RemoteCache>> {
    info!("Using default remote backend (Memcached)");
    let store = tokio::task::spawn_blocking(crate::backends::MemcachedStore::new).await??;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "backend-memcached"))]
async fn default_remote() -> Result<Arc<dyn RemoteCache>> {
    anyhow::bail!("no remote backend configured and the `memcached` feature is disabled")
}
