//! Throughput of the in-memory backend's CAS path, the hot path every
//! retry loop drives under contention.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ocra_ratelimit::{Backend, MemoryBackend};
use std::time::Duration;

fn bench_get_miss(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let backend = MemoryBackend::new();
    c.bench_function("memory_get_miss", |b| {
        b.to_async(&rt).iter(|| async { backend.get("missing-key").await.unwrap() });
    });
}

fn bench_check_and_set_uncontended(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let backend = MemoryBackend::new();
    c.bench_function("memory_check_and_set_uncontended", |b| {
        b.to_async(&rt).iter_batched(
            || (),
            |_| async {
                backend
                    .check_and_set("bench-key", None, "11|1.0|0".to_string(), Duration::from_secs(60))
                    .await
                    .unwrap();
                backend.delete("bench-key").await.unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_get_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let backend = MemoryBackend::new();
    rt.block_on(async {
        backend.set("hot-key", "11|1.0|0".to_string(), Duration::from_secs(60)).await.unwrap();
    });
    c.bench_function("memory_get_hit", |b| {
        b.to_async(&rt).iter(|| async { backend.get("hot-key").await.unwrap() });
    });
}

criterion_group!(benches, bench_get_miss, bench_get_hit, bench_check_and_set_uncontended);
criterion_main!(benches);
