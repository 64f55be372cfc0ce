//! Benchmarks for chunked multi-get
//!
//! This benchmark suite measures the performance of:
//! - Remote multi-get for different batch sizes
//! - Local-tier answers for already memoized keys
//! - The effect of the chunk size on large batches

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use tiered_object_cache::{MemoryStore, ObjectCacheConfig, ObjectCacheSystem, ObjectCacheSystemBuilder};
use tokio::runtime::Runtime;

/// Setup a system over a store holding every other key
fn setup(batch_size: usize, keys: &[String]) -> (ObjectCacheSystem, Runtime) {
    let rt = Runtime::new().unwrap_or_else(|_| panic!("Failed to create runtime"));
    let system = rt.block_on(async {
        let system = ObjectCacheSystemBuilder::new()
            .with_remote(Arc::new(MemoryStore::new()))
            .with_config(ObjectCacheConfig {
                batch_size,
                ..ObjectCacheConfig::default()
            })
            .build()
            .await
            .unwrap_or_else(|_| panic!("Failed to create object cache system"));

        let mut writer = system.begin();
        writer
            .set_multiple(keys.iter().step_by(2).map(|key| (key.clone(), 1)), "", None)
            .await;
        system
    });
    (system, rt)
}

fn keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("mget_{i}")).collect()
}

/// Benchmark cold multi-gets (every key fetched remotely)
fn bench_remote_multi_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_get_remote");

    for count in &[10, 100, 1000, 4000] {
        let keys = keys(*count);
        let (system, rt) = setup(1000, &keys);

        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let mut cache = system.begin();
                    black_box(cache.get_multiple(&keys, "", false).await)
                })
            });
        });
    }

    group.finish();
}

/// Benchmark warm multi-gets answered by the local tier
fn bench_local_multi_get(c: &mut Criterion) {
    let keys = keys(1000);
    let (system, rt) = setup(1000, &keys);
    let mut cache = system.begin();
    rt.block_on(cache.get_multiple(&keys, "", false));

    c.bench_function("multi_get_local_1000", |b| {
        b.iter(|| rt.block_on(cache.get_multiple(black_box(&keys), "", false)));
    });
}

/// Benchmark chunk sizes for a 4000-key batch
fn bench_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_get_chunk_size");
    let keys = keys(4000);

    for batch_size in &[100, 500, 1000, 4000] {
        let (system, rt) = setup(*batch_size, &keys);

        group.bench_with_input(BenchmarkId::from_parameter(batch_size), batch_size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let mut cache = system.begin();
                    black_box(cache.get_multiple(&keys, "", false).await)
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_remote_multi_get, bench_local_multi_get, bench_chunk_sizes);
criterion_main!(benches);
