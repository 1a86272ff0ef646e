//! Performance benchmarks for sub-document batches.
//!
//! These benchmarks measure:
//! - Append overhead (validation and value encoding per spec)
//! - Compilation (records plus arena for 1 vs 4 vs 16 specs)
//! - Decoding (validating a received record block)
//! - Full roundtrip through the in-memory bucket
//!
//! Run with: `cargo bench -p docbatch-sdk`

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use docbatch_sdk::{CompiledBatch, ExecOptions, SubdocExecutor, mock::MockBucket};
use serde_json::json;
use tokio::runtime::Runtime;

/// Creates a runtime for async benchmarks.
fn create_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create runtime")
}

// ============================================================================
// Builder Benchmarks
// ============================================================================

/// Benchmark appending and compiling mutation batches of varying size.
fn bench_compile(c: &mut Criterion) {
    let bucket = MockBucket::new("bench");
    let payload = json!({"name": "alice", "tags": ["a", "b", "c"], "score": 42});

    let mut group = c.benchmark_group("compile");
    for batch_size in [1usize, 4, 16] {
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, &n| {
            b.iter(|| {
                let mut request = bucket.subdoc("user:bench", false).expect("key");
                for i in 0..n {
                    request.dict_upsert(format!("field{i}.value"), &payload).expect("append");
                }
                black_box(request.to_buffer().expect("compile").arena().len())
            })
        });
    }
    group.finish();
}

/// Benchmark validating a received record block.
fn bench_decode(c: &mut Criterion) {
    let bucket = MockBucket::new("bench");
    let mut request = bucket.subdoc("user:bench", false).expect("key");
    for i in 0..16 {
        request.get(format!("path.to.field{i}")).expect("append");
    }
    let batch = request.to_buffer().expect("compile").clone();

    c.bench_function("decode_16_specs", |b| {
        b.iter(|| {
            black_box(
                CompiledBatch::from_parts(batch.records_bytes(), batch.arena().to_vec())
                    .expect("decode"),
            )
        })
    });
}

// ============================================================================
// Roundtrip Benchmarks
// ============================================================================

/// Benchmark a lookup batch executed against the in-memory bucket.
fn bench_roundtrip(c: &mut Criterion) {
    let rt = create_runtime();
    let bucket = MockBucket::new("bench");
    bucket.set_document("user:bench", json!({"profile": {"name": "alice", "visits": [1, 2, 3]}}));

    c.bench_function("lookup_roundtrip", |b| {
        b.to_async(&rt).iter(|| async {
            let mut request = bucket.subdoc("user:bench", false).expect("key");
            request
                .get("profile.name")
                .expect("append")
                .get_count("profile.visits")
                .expect("append");
            black_box(request.execute(ExecOptions::default()).await.expect("execute"))
        })
    });
}

criterion_group!(
    name = builder_benches;
    config = Criterion::default().sample_size(100);
    targets = bench_compile, bench_decode
);

criterion_group!(
    name = roundtrip_benches;
    config = Criterion::default().sample_size(100);
    targets = bench_roundtrip
);

criterion_main!(builder_benches, roundtrip_benches);
