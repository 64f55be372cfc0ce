//! Integration tests for incr/decr
//!
//! Counters are stored as bare decimals so the remote store's native
//! increment works across units of work.

mod common;

use common::*;
use std::collections::BTreeMap;
use tiered_object_cache::{CacheValue, CounterError};

/// Test the basic increment scenario
#[tokio::test]
async fn test_incr_scenario() {
    let env = setup().await;
    let mut cache = env.begin();

    assert!(cache.add("key", 1, "", None).await);
    assert_eq!(cache.incr("key", 1, "").await, Ok(2));

    assert!(cache.add("key2", 1, "", None).await);
    assert_eq!(cache.incr("key2", 5, "").await, Ok(6));

    assert!(matches!(
        cache.incr("key3", 1, "").await,
        Err(CounterError::NotFound { .. })
    ));
}

/// Test increments are visible to other units of work
#[tokio::test]
async fn test_incr_is_shared_remotely() {
    let env = setup().await;
    let key = test_key("views");

    let mut first = env.begin();
    first.set(&key, 10, "stats", None).await;
    assert_eq!(first.incr(&key, 1, "stats").await, Ok(11));

    let mut second = env.begin();
    assert_eq!(second.incr(&key, 4, "stats").await, Ok(15));
    assert_eq!(second.get(&key, "stats", false).await.value, CacheValue::Int(15));

    // The first unit of work re-reads on force
    assert_eq!(first.get(&key, "stats", true).await.value, CacheValue::Int(15));
}

/// Test decrement floors at zero
#[tokio::test]
async fn test_decr_floors_at_zero() {
    let env = setup().await;
    let mut cache = env.begin();

    cache.set("n", 10, "", None).await;
    assert_eq!(cache.decr("n", 3, "").await, Ok(7));
    assert_eq!(cache.decr("n", 100, "").await, Ok(0));
    assert_eq!(cache.get("n", "", false).await.value, CacheValue::Int(0));

    assert!(matches!(
        cache.decr("missing", 1, "").await,
        Err(CounterError::NotFound { .. })
    ));
}

/// Test non-integer values are rejected, both from the local tier and remotely
#[tokio::test]
async fn test_non_integer_rejected() {
    init_tracing();
    let env = setup().await;

    let mut map = BTreeMap::new();
    map.insert("a".to_string(), CacheValue::Int(1));
    let values = [
        ("string", CacheValue::from("abc")),
        ("float", CacheValue::Float(1.5)),
        ("sequence", CacheValue::from(vec![CacheValue::Int(1)])),
        ("map", CacheValue::from(map)),
        ("numeric_string", CacheValue::from("42")),
    ];

    for (name, value) in values {
        let expected = value.kind();

        // Local tier check
        let mut writer = env.begin();
        writer.set(name, value.clone(), "", None).await;
        match writer.incr(name, 1, "").await {
            Err(CounterError::NotInteger { kind, .. }) => assert_eq!(kind, expected),
            other => panic!("{name}: expected NotInteger, got {other:?}"),
        }

        // Remote check with an empty local tier
        let mut reader = env.begin();
        match reader.decr(name, 1, "").await {
            Err(CounterError::NotInteger { kind, .. }) => assert_eq!(kind, expected),
            other => panic!("{name}: expected NotInteger, got {other:?}"),
        }

        // The stored value is untouched
        let mut check = env.begin();
        assert_eq!(check.get(name, "", false).await.value, value);
    }
}

/// Test an unreachable remote reports the counter as unavailable
#[tokio::test]
async fn test_incr_remote_unavailable() {
    let env = setup().await;
    let mut writer = env.begin();
    writer.set("n", 1, "", None).await;

    env.store.set_available(false);
    let mut cache = env.begin();
    assert!(matches!(
        cache.incr("n", 1, "").await,
        Err(CounterError::Unavailable { .. })
    ));

    env.store.set_available(true);
    let mut check = env.begin();
    assert_eq!(check.get("n", "", false).await.value, CacheValue::Int(1));
}

/// Test counters in non-persistent groups stay local
#[tokio::test]
async fn test_non_persistent_counter() {
    let env = setup().await;
    let mut cache = env.begin();
    cache.add_non_persistent_groups(["counts"]);

    assert!(matches!(
        cache.incr("hits", 1, "counts").await,
        Err(CounterError::NotFound { .. })
    ));

    cache.set("hits", 1, "counts", None).await;
    assert_eq!(cache.incr("hits", 2, "counts").await, Ok(3));
    assert_eq!(cache.decr("hits", 5, "counts").await, Ok(0));
    assert!(env.store.is_empty());
}

/// Test negative values are outside the counter range on both paths
#[tokio::test]
async fn test_negative_values_are_out_of_range() {
    let env = setup().await;
    let mut writer = env.begin();
    writer.add_non_persistent_groups(["counts"]);

    assert!(writer.set("neg", -5, "", None).await);
    assert!(writer.set("neg", -5, "counts", None).await);

    // Local tier check
    assert!(matches!(
        writer.incr("neg", 1, "").await,
        Err(CounterError::OutOfRange { value: -5, .. })
    ));
    assert!(matches!(
        writer.incr("neg", 1, "counts").await,
        Err(CounterError::OutOfRange { value: -5, .. })
    ));

    // Remote check with an empty local tier
    let mut reader = env.begin();
    assert!(matches!(
        reader.decr("neg", 1, "").await,
        Err(CounterError::OutOfRange { value: -5, .. })
    ));
    assert!(matches!(
        reader.incr("neg", 1, "").await,
        Err(CounterError::OutOfRange { value: -5, .. })
    ));
    assert_eq!(reader.get_stats().remote_failures, 0);
    assert_eq!(reader.get("neg", "", true).await.value, CacheValue::Int(-5));
}

/// Test an increment past i64::MAX is refused and leaves the value readable
#[tokio::test]
async fn test_increment_overflow_is_refused() {
    let env = setup().await;
    let mut writer = env.begin();
    writer.set("big", i64::MAX, "", None).await;
    writer.set("near", i64::MAX - 1, "", None).await;

    // Local tier check
    assert!(matches!(
        writer.incr("big", 1, "").await,
        Err(CounterError::OutOfRange { .. })
    ));

    // Remote path: the store overflows, the increment is taken back
    let mut reader = env.begin();
    assert!(matches!(
        reader.incr("near", 2, "").await,
        Err(CounterError::OutOfRange { .. })
    ));
    assert_eq!(reader.incr("near", 1, "").await, Ok(i64::MAX));
    assert!(matches!(
        reader.incr("near", u64::MAX, "").await,
        Err(CounterError::OutOfRange { .. })
    ));

    let mut check = env.begin();
    let lookup = check.get("big", "", false).await;
    assert!(lookup.found);
    assert_eq!(lookup.value, CacheValue::Int(i64::MAX));
    assert_eq!(check.get("near", "", false).await.value, CacheValue::Int(i64::MAX));
}

/// Test a huge decrement floors at zero instead of failing
#[tokio::test]
async fn test_huge_decrement_floors_at_zero() {
    let env = setup().await;
    let mut writer = env.begin();
    writer.set("n", 7, "", None).await;

    let mut reader = env.begin();
    assert_eq!(reader.decr("n", u64::MAX, "").await, Ok(0));
}
