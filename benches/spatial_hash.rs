//! Benchmarks for neighbor search.
//!
//! Run with: `cargo bench --bench spatial_hash`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sphfluid::SpatialHash;

const SPACING: f32 = 0.04;

fn cloud(count: usize) -> Vec<Vec3> {
    let mut rng = SmallRng::seed_from_u64(42);
    // Roughly rest density: one particle per half-spacing cube.
    let side = (count as f32).cbrt() * SPACING * 0.5;
    (0..count)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-side..side),
                rng.gen_range(-side..side),
                rng.gen_range(-side..side),
            )
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_hash_build");

    for count in [1_000, 6_000, 20_000] {
        let positions = cloud(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut hash = SpatialHash::new(SPACING, count);
            b.iter(|| hash.build(black_box(&positions), count))
        });
    }

    group.finish();
}

fn bench_query_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_hash_query_all");

    for count in [1_000, 6_000] {
        let positions = cloud(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut hash = SpatialHash::new(SPACING, count);
            hash.build(&positions, count);
            b.iter(|| {
                let mut total = 0;
                for i in 0..count {
                    total += hash.query(&positions, i, SPACING).len();
                }
                black_box(total)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_query_all);
criterion_main!(benches);
