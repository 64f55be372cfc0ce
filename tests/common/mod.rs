//! Common utilities for integration tests
//!
//! This module provides shared test infrastructure including:
//! - Shared in-memory remote store setup
//! - Unit-of-work helpers
//! - Unique key generation

#![allow(dead_code)]

use std::sync::Arc;
use tiered_object_cache::{
    JsonCodec, MemoryStore, ObjectCache, ObjectCacheConfig, ObjectCacheSystem,
    ObjectCacheSystemBuilder,
};

/// Get Memcached URL from environment or use default
pub fn memcached_url() -> String {
    std::env::var("MEMCACHED_URL").unwrap_or_else(|_| "memcache://127.0.0.1:11211".to_string())
}

/// Create a unique key so tests sharing a real server do not collide
pub fn test_key(name: &str) -> String {
    format!("test_{}_{}", name, rand::random::<u32>())
}

/// A shared in-memory store plus a system over it
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub system: ObjectCacheSystem,
}

impl TestEnv {
    /// Start a fresh unit of work against the shared store
    pub fn begin(&self) -> ObjectCache {
        self.system.begin()
    }

    /// Start a unit of work with a different configuration over the same store
    pub fn begin_with(&self, config: &ObjectCacheConfig) -> ObjectCache {
        ObjectCache::new(self.store.clone(), Arc::new(JsonCodec), config)
    }
}

/// Build a system with default configuration over a fresh `MemoryStore`
pub async fn setup() -> TestEnv {
    setup_with_config(ObjectCacheConfig::default()).await
}

/// Build a system with `config` over a fresh `MemoryStore`
pub async fn setup_with_config(config: ObjectCacheConfig) -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let system = ObjectCacheSystemBuilder::new()
        .with_remote(store.clone())
        .with_config(config)
        .build()
        .await
        .expect("Failed to build object cache system");
    TestEnv { store, system }
}

/// Install a tracing subscriber once, honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let key1 = test_key("user");
        let key2 = test_key("user");
        assert_ne!(key1, key2, "Keys should be unique");
        assert!(key1.starts_with("test_user_"));
    }
}
