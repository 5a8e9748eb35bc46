//! Run with:
//! ```bash
//! RUSTFLAGS="-C target-cpu=native" cargo bench --bench benchmark
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use ravelmap::dtw::{dtw_global, dtw_global_slantedbanded, dtw_global_slantedbanded_antidiag};

/// Fixed RNG seed for reproducible benchmarks.
const SEED: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// Generate a random event vector of length `len`, matching the scale
/// of quantized nanopore current values.
fn generate_random_events(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen::<f32>() * 8.0 - 4.0).collect()
}

/// The unbanded O(mn) DTW recurrence, the baseline every banded variant
/// must agree with.
fn bench_dtw_global(c: &mut Criterion) {
    let mut group = c.benchmark_group("dtw_global");
    for &len in &[50usize, 200, 1000] {
        let a = generate_random_events(len, SEED);
        let b = generate_random_events(len, SEED + 1);
        group.throughput(Throughput::Elements((len * len) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |bencher, _| {
            bencher.iter(|| dtw_global(black_box(&a), black_box(&b), false));
        });
    }
    group.finish();
}

/// Slanted-banded DTW: same recurrence, `O(m * band_radius)` work.
fn bench_dtw_slantedbanded(c: &mut Criterion) {
    let mut group = c.benchmark_group("dtw_slantedbanded");
    for &len in &[50usize, 200, 1000] {
        let a = generate_random_events(len, SEED);
        let b = generate_random_events(len, SEED + 1);
        let band_radius = (len as f32 * 0.1).max(1.0) as u32;
        group.throughput(Throughput::Elements((len as u64) * band_radius as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |bencher, _| {
            bencher.iter(|| dtw_global_slantedbanded(black_box(&a), black_box(&b), band_radius, false));
        });
    }
    group.finish();
}

/// The antidiagonal-banded variant, filled in antidiagonal order for
/// better cache behavior on wide bands.
fn bench_dtw_slantedbanded_antidiag(c: &mut Criterion) {
    let mut group = c.benchmark_group("dtw_slantedbanded_antidiag");
    for &len in &[50usize, 200, 1000] {
        let a = generate_random_events(len, SEED);
        let b = generate_random_events(len, SEED + 1);
        let band_radius = (len as f32 * 0.1).max(1.0) as u32;
        group.throughput(Throughput::Elements((len as u64) * band_radius as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |bencher, _| {
            bencher.iter(|| dtw_global_slantedbanded_antidiag(black_box(&a), black_box(&b), band_radius, false));
        });
    }
    group.finish();
}

/// End-to-end seed -> chain throughput over a synthetic reference,
/// scaling the anchor count with reference length.
fn bench_chaining(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_anchors");
    for &n_anchors in &[100usize, 1_000, 10_000] {
        let anchors: Vec<ravelmap::types::Anchor> = (0..n_anchors)
            .map(|i| ravelmap::types::Anchor {
                query_position: (i * 10) as u32,
                target_position: (i * 10) as u32,
            })
            .collect();
        let opt = ravelmap::config::MapOpt::default();
        group.throughput(Throughput::Elements(n_anchors as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_anchors), &n_anchors, |bencher, _| {
            bencher.iter(|| ravelmap::chain::chain_anchors(black_box(&anchors), 0, 0, &opt));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_dtw_global,
    bench_dtw_slantedbanded,
    bench_dtw_slantedbanded_antidiag,
    bench_chaining,
);
criterion_main!(benches);
