use std::sync::Arc;

use annsearch::config::{HnswParams, PniiBuildParams};
use annsearch::hnsw;
use annsearch::object::ObjectBufferBuilder;
use annsearch::pnii;
use annsearch::space::{Metric, Space, VectorSpace};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

fn generate_vector(dim: usize, seed: usize) -> Vec<f32> {
    (0..dim)
        .map(|j| ((seed * dim + j) % 100) as f32 / 100.0)
        .collect()
}

fn build_space(count: usize, dim: usize) -> Arc<dyn Space> {
    let mut b = ObjectBufferBuilder::new();
    for i in 0..count {
        let v = generate_vector(dim, i);
        let bytes: Vec<u8> = v.iter().flat_map(|f| f.to_le_bytes()).collect();
        b.push(&bytes, None).unwrap();
    }
    Arc::new(VectorSpace::new(b.build(), dim, Metric::Euclidean).unwrap())
}

fn bench_hnsw_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_build");
    group.sample_size(10);

    for size in [1000, 5000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("n", size), size, |b, &size| {
            b.iter_batched(
                || build_space(size, 128),
                |space| {
                    black_box(hnsw::build(space, HnswParams::with_m(16)).unwrap());
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_pnii_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("pnii_build");
    group.sample_size(10);

    for size in [1000, 5000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("n", size), size, |b, &size| {
            b.iter_batched(
                || build_space(size, 128),
                |space| {
                    black_box(pnii::build(space, PniiBuildParams::new(64, 12)).unwrap());
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_hnsw_build_dimensions(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_build_by_dimension");
    group.sample_size(10);

    for dim in [64, 384, 768].iter() {
        group.bench_with_input(BenchmarkId::new("dim", dim), dim, |b, &dim| {
            b.iter_batched(
                || build_space(2000, dim),
                |space| {
                    black_box(hnsw::build(space, HnswParams::with_m(16)).unwrap());
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hnsw_build,
    bench_pnii_build,
    bench_hnsw_build_dimensions
);
criterion_main!(benches);
