// sptl: reduce/scan/pack throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sptl::{filter, reduce, scan, ScanType};

/// Ascending inputs let the branch predictor win trivially on `filter`;
/// shuffled inputs from a fixed seed give every run the same unpredictable
/// pattern without making the benchmark non-reproducible.
fn shuffled(n: usize) -> Vec<i64> {
    let mut values: Vec<i64> = (0..n as i64).collect();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for i in (1..values.len()).rev() {
        let j = rng.gen_range(0..=i);
        values.swap(i, j);
    }
    values
}

fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_sum");
    for n in [1_000usize, 100_000, 1_000_000] {
        let values: Vec<u64> = shuffled(n).into_iter().map(|x| x as u64).collect();
        group.bench_with_input(BenchmarkId::new("n", n), &values, |b, values| {
            b.iter(|| black_box(reduce(values, 0u64, |a, b| a + b)));
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_forward_exclusive");
    for n in [1_000usize, 100_000, 1_000_000] {
        let values: Vec<u64> = shuffled(n).into_iter().map(|x| x as u64).collect();
        let mut out = vec![0u64; n];
        group.bench_with_input(BenchmarkId::new("n", n), &values, |b, values| {
            b.iter(|| scan(values, &mut out, 0u64, |a, b| a + b, ScanType::ForwardExclusive));
        });
    }
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_even");
    for n in [1_000usize, 100_000, 1_000_000] {
        let values = shuffled(n);
        group.bench_with_input(BenchmarkId::new("n", n), &values, |b, values| {
            b.iter(|| black_box(filter(values, |&x| x % 2 == 0)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reduce, bench_scan, bench_filter);
criterion_main!(benches);
