//! Remote Cache Backend Implementations
//!
//! This module contains the [`RemoteCache`](crate::traits::RemoteCache)
//! implementations the object cache can sit in front of.
//!
//! # Available Backends
//!
//! - **Memcached** - Distributed cache, the production remote tier (feature: `backend-memcached`)
//! - **`MemoryStore`** - In-process `DashMap` store with memcached semantics
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tiered_object_cache::backends::MemoryStore;
//! use tiered_object_cache::ObjectCacheSystemBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let system = ObjectCacheSystemBuilder::new()
//!     .with_remote(Arc::new(MemoryStore::new()))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod memory_store;

#[cfg(feature = "backend-memcached")]
pub mod memcached_store;

pub use memory_store::MemoryStore;

#[cfg(feature = "backend-memcached")]
pub use memcached_store::MemcachedStore;
