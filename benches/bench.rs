//! Criterion benchmarks for the Magnitude vector search engine.
//!
//! Covers the three hot paths:
//! - the distance kernel itself
//! - exact (flat) search
//! - approximate (IVF) search at different probe counts

use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use magnitude::index::{Index, VectorIndex};
use magnitude::vector::{DistanceMetric, Vector};

const DIMENSION: usize = 64;
const VECTOR_COUNT: usize = 10_000;

/// Deterministic pseudo-random vectors, no rng setup needed.
fn generate_vectors(count: usize, dimension: usize) -> Vec<Vector> {
    (0..count)
        .map(|i| {
            Vector::new(
                (0..dimension)
                    .map(|j| ((i * 31 + j * 7) as f32 * 0.137).sin())
                    .collect(),
            )
        })
        .collect()
}

fn query() -> Vec<f32> {
    (0..DIMENSION).map(|j| (j as f32 * 0.31).cos()).collect()
}

fn bench_distance_kernel(c: &mut Criterion) {
    let vectors = generate_vectors(2, DIMENSION);
    let (a, b) = (&vectors[0], &vectors[1]);

    let mut group = c.benchmark_group("distance_kernel");
    group.throughput(Throughput::Elements(DIMENSION as u64));
    group.bench_function("l2", |bencher| {
        bencher.iter(|| {
            DistanceMetric::L2
                .score(black_box(&a.data), black_box(&b.data))
                .unwrap()
        })
    });
    group.bench_function("inner_product", |bencher| {
        bencher.iter(|| {
            DistanceMetric::InnerProduct
                .score(black_box(&a.data), black_box(&b.data))
                .unwrap()
        })
    });
    group.finish();
}

fn bench_flat_search(c: &mut Criterion) {
    let mut index = Index::new_flat(DIMENSION, DistanceMetric::L2);
    for vector in generate_vectors(VECTOR_COUNT, DIMENSION) {
        index.insert(vector).unwrap();
    }
    let query = query();

    let mut group = c.benchmark_group("flat_search");
    group.throughput(Throughput::Elements(VECTOR_COUNT as u64));
    group.bench_function("top10", |bencher| {
        bencher.iter(|| index.search(black_box(&query), 10).unwrap())
    });
    group.finish();
}

fn bench_ivf_search(c: &mut Criterion) {
    let vectors = generate_vectors(VECTOR_COUNT, DIMENSION);
    let mut index = Index::new_ivf(DIMENSION, DistanceMetric::L2);
    index.as_ivf_mut().unwrap().train(&vectors, 100, 42).unwrap();
    for vector in vectors {
        index.insert(vector).unwrap();
    }
    let query = query();
    let ivf = index.as_ivf().unwrap();

    let mut group = c.benchmark_group("ivf_search");
    for nprobe in [1, 4, 16] {
        group.bench_function(format!("top10_nprobe{nprobe}"), |bencher| {
            bencher.iter(|| {
                ivf.search_with_probes(black_box(&query), 10, nprobe)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_distance_kernel,
    bench_flat_search,
    bench_ivf_search
);
criterion_main!(benches);
