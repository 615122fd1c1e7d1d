//! Benchmarks for cache key derivation
//!
//! This benchmark measures:
//! - Bare-path key derivation
//! - Canonical query encoding as parameter counts grow
//! - SHA-256 body digest overhead

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use readthrough::{CacheKey, RequestDescriptor};
use serde_json::json;

fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_derivation");

    let bare = RequestDescriptor::get("/roms");
    group.bench_function("bare_path", |b| {
        b.iter(|| CacheKey::derive(black_box(&bare)))
    });

    for params in [2usize, 8, 32] {
        let mut descriptor = RequestDescriptor::get("/roms");
        for i in 0..params {
            descriptor = descriptor.with_query(format!("param{i}"), i.to_string());
        }
        group.bench_with_input(
            BenchmarkId::new("query_params", params),
            &descriptor,
            |b, descriptor| b.iter(|| CacheKey::derive(black_box(descriptor))),
        );
    }

    let with_body = RequestDescriptor::post("/search").with_body(json!({
        "query": "super mario",
        "platforms": [1, 2, 3],
        "regions": ["ntsc", "pal"],
        "limit": 50,
    }));
    group.bench_function("json_body_digest", |b| {
        b.iter(|| CacheKey::derive(black_box(&with_body)))
    });

    group.finish();
}

criterion_group!(benches, bench_key_derivation);
criterion_main!(benches);
