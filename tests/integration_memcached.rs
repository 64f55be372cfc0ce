//! Integration tests against a real memcached server
//!
//! These tests require memcached at `MEMCACHED_URL`
//! (default `memcache://127.0.0.1:11211`). Run with:
//!
//! ```text
//! cargo test --test integration_memcached -- --ignored
//! ```

#![cfg(feature = "backend-memcached")]

mod common;

use common::*;
use std::sync::Arc;
use tiered_object_cache::{
    CacheValue, CounterError, MemcachedStore, ObjectCacheConfig, ObjectCacheSystem,
    ObjectCacheSystemBuilder,
};

async fn setup_memcached() -> ObjectCacheSystem {
    let url = memcached_url();
    let store = tokio::task::spawn_blocking(move || MemcachedStore::with_url(&url))
        .await
        .expect("spawn_blocking panicked")
        .expect("Failed to connect to memcached");

    ObjectCacheSystemBuilder::new()
        .with_remote(Arc::new(store))
        .with_config(ObjectCacheConfig {
            key_salt: format!("{}:", test_key("salt")),
            ..ObjectCacheConfig::default()
        })
        .build()
        .await
        .expect("Failed to build object cache system")
}

/// Test the basic primitives against memcached
#[tokio::test]
#[ignore = "requires a running memcached server"]
async fn test_memcached_primitives() {
    let system = setup_memcached().await;
    assert!(system.health_check().await);

    let mut cache = system.begin();
    assert!(cache.add("k", "v", "", None).await);
    assert!(!cache.add("k", "v", "", None).await);
    assert!(!cache.replace("missing", "v", "", None).await);

    let mut reader = system.begin();
    assert_eq!(reader.get("k", "", false).await.value, CacheValue::from("v"));
    assert!(reader.delete("k", "").await);
    assert!(!reader.get("k", "", true).await.found);
}

/// Test native counters against memcached
#[tokio::test]
#[ignore = "requires a running memcached server"]
async fn test_memcached_counters() {
    let system = setup_memcached().await;
    let mut cache = system.begin();

    cache.set("n", 1, "", None).await;
    assert_eq!(cache.incr("n", 5, "").await, Ok(6));
    assert_eq!(cache.decr("n", 10, "").await, Ok(0));
    assert!(matches!(
        cache.incr("missing", 1, "").await,
        Err(CounterError::NotFound { .. })
    ));

    cache.set("s", "abc", "", None).await;
    let mut reader = system.begin();
    assert!(matches!(
        reader.incr("s", 1, "").await,
        Err(CounterError::NotInteger { .. })
    ));
}

/// Test chunked multi-get and flush against memcached
#[tokio::test]
#[ignore = "requires a running memcached server"]
async fn test_memcached_multi_get_and_flush() {
    let system = setup_memcached().await;
    let mut writer = system.begin();
    writer.set("mget_1", 1, "", None).await;
    writer.set("mget_2500", 2500, "", None).await;

    let keys: Vec<String> = (0..3000).map(|i| format!("mget_{i}")).collect();
    let mut reader = system.begin();
    let results = reader.get_multiple(&keys, "", false).await;
    assert_eq!(results.len(), 3000);
    assert_eq!(results["mget_2500"].value, CacheValue::Int(2500));
    assert!(!results["mget_2"].found);

    assert!(reader.flush().await.is_persisted());
    assert!(!reader.get("mget_1", "", false).await.found);
}
