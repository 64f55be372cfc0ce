//! Integration tests for non-persistent groups
//!
//! Non-persistent groups live only in the local tier and never touch the
//! remote store.

mod common;

use common::*;
use tiered_object_cache::{CacheValue, ObjectCacheConfig};

/// Test set/get in a non-persistent group reports found = false
#[tokio::test]
async fn test_non_persistent_get_reports_not_found() {
    let env = setup().await;
    let mut cache = env.begin();
    cache.add_non_persistent_groups(["counts"]);
    assert!(cache.groups().is_non_persistent("counts"));

    assert!(cache.set("k", "v", "counts", None).await);
    let lookup = cache.get("k", "counts", false).await;
    assert!(!lookup.found);
    assert_eq!(lookup.value, CacheValue::from("v"));

    // Force has no effect without a remote copy
    assert_eq!(cache.get("k", "counts", true).await.value, CacheValue::from("v"));

    let multi = cache.get_multiple(["k", "other"], "counts", false).await;
    assert_eq!(multi["k"].value, CacheValue::from("v"));
    assert!(!multi["k"].found);
    assert_eq!(multi["other"].value, CacheValue::MISS);
}

/// Test non-persistent values never reach the remote store
#[tokio::test]
async fn test_non_persistent_never_written_remotely() {
    let env = setup_with_config(ObjectCacheConfig {
        non_persistent_groups: vec!["counts".into()],
        ..ObjectCacheConfig::default()
    })
    .await;
    let mut cache = env.begin();

    cache.set("k", "v", "counts", None).await;
    cache.add("a", 1, "counts", None).await;
    cache.get("missing", "counts", false).await;

    let physical = cache.key("k", "counts").await;
    assert_eq!(env.store.raw_get(&physical), None);
    assert!(env.store.is_empty());
    assert_eq!(env.store.write_count(), 0);
    assert_eq!(cache.get_stats().remote_calls, 0);

    let mut other = env.begin();
    assert_eq!(other.get("k", "counts", true).await.value, CacheValue::MISS);
}

/// Test add/replace/delete semantics on the local tier alone
#[tokio::test]
async fn test_non_persistent_write_primitives() {
    let env = setup().await;
    let mut cache = env.begin();
    cache.add_non_persistent_groups(["session"]);

    assert!(cache.replace("k", "r", "session", None).await);
    assert!(!cache.add("k", "a", "session", None).await);
    assert_eq!(cache.get("k", "session", false).await.value, CacheValue::from("r"));

    assert!(cache.delete("k", "session").await);
    assert!(!cache.delete("k", "session").await);
    assert!(cache.add("k", "a", "session", None).await);
}

/// Test flush and flush_runtime clear non-persistent data
#[tokio::test]
async fn test_flush_clears_non_persistent() {
    let env = setup().await;
    let mut cache = env.begin();
    cache.add_non_persistent_groups(["session"]);

    cache.set("k", "v", "session", None).await;
    cache.flush().await;
    assert_eq!(cache.get("k", "session", false).await.value, CacheValue::MISS);

    cache.set("k", "v", "session", None).await;
    cache.flush_runtime();
    assert_eq!(cache.get("k", "session", false).await.value, CacheValue::MISS);
}

/// Test a group may be both global and non-persistent
#[tokio::test]
async fn test_global_non_persistent_group() {
    let env = setup().await;
    let mut cache = env.begin();
    cache.add_global_groups(["plugins"]);
    cache.add_non_persistent_groups(["plugins"]);

    cache.set("list", "v", "plugins", None).await;
    assert!(cache.key("list", "plugins").await.starts_with("global:"));

    // Global scope means the entry survives a blog switch locally
    cache.switch_to_blog(5);
    assert_eq!(cache.get("list", "plugins", false).await.value, CacheValue::from("v"));
    assert!(env.store.is_empty());
}
