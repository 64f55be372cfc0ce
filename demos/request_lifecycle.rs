//! Request Lifecycle Example
//!
//! Demonstrates one object cache per request: read-through caching, group
//! policy, counters, tenant switching and flush.
//!
//! Uses the in-process `MemoryStore`, so no server is needed.
//!
//! Run with: cargo run --example request_lifecycle

use std::sync::Arc;
use std::time::Duration;
use tiered_object_cache::{
    CacheValue, MemoryStore, ObjectCacheConfig, ObjectCacheSystemBuilder,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!("=== Tiered Object Cache: Request Lifecycle ===\n");

    // 1. One system per process
    let system = ObjectCacheSystemBuilder::new()
        .with_remote(Arc::new(MemoryStore::new()))
        .with_config(ObjectCacheConfig {
            global_groups: vec!["users".into()],
            non_persistent_groups: vec!["request".into()],
            ..ObjectCacheConfig::default()
        })
        .build()
        .await?;

    // 2. First request: populate
    let mut cache = system.begin();
    cache.set("post:42", "Hello, world", "posts", Some(Duration::from_secs(300))).await;
    cache.set("user:1", "alice", "users", None).await;
    cache.add("views:42", 0, "stats", None).await;
    cache.set("started", true, "request", None).await;
    println!("Request 1 stats: {:?}\n", cache.finish());

    // 3. Second request: read through the remote tier
    let mut cache = system.begin();
    let post = cache.get("post:42", "posts", false).await;
    println!("post:42 found={} value={:?}", post.found, post.value);

    match cache.incr("views:42", 1, "stats").await {
        Ok(views) => println!("views:42 -> {views}"),
        Err(e) => println!("incr failed: {e}"),
    }

    // Non-persistent data did not survive the previous request
    let started = cache.get("started", "request", false).await;
    println!("started (non-persistent) value={:?}", started.value);

    // 4. Another tenant shares global groups only
    cache.switch_to_blog(2);
    let user = cache.get("user:1", "users", false).await;
    let other_post = cache.get("post:42", "posts", false).await;
    println!("blog 2: user:1 found={} post:42 found={}", user.found, other_post.found);
    println!("physical key for user:1 = {}\n", cache.key("user:1", "users").await);

    // 5. Multi-get in bounded chunks
    let keys: Vec<String> = (0..2500).map(|i| format!("item:{i}")).collect();
    cache
        .set_multiple([("item:7", CacheValue::Int(7)), ("item:2400", CacheValue::Int(2400))], "items", None)
        .await;
    cache.flush_runtime();
    let items = cache.get_multiple(&keys, "items", false).await;
    let hits = items.values().filter(|lookup| lookup.found).count();
    println!("get_multiple: {} keys, {} hits", items.len(), hits);

    // 6. Flush blog 1 and the global groups
    cache.switch_to_blog(1);
    let report = cache.flush().await;
    println!("flush persisted={} generation={}", report.is_persisted(), report.blog.generation());
    let post = cache.get("post:42", "posts", false).await;
    println!("post:42 after flush found={}\n", post.found);

    let stats = cache.finish();
    println!("=== Cache Statistics ===");
    println!("Local hits: {}", stats.local_hits);
    println!("Remote hits: {}", stats.remote_hits);
    println!("Misses: {}", stats.misses);
    println!("Remote calls: {}", stats.remote_calls);
    println!("Hit rate: {:.2}%", stats.hit_rate);

    Ok(())
}
