// sptl: parallel_for throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sptl::parallel_for_default;

fn bench_parallel_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_for_default");
    for n in [1_000usize, 100_000, 1_000_000] {
        group.bench_with_input(BenchmarkId::new("n", n), &n, |b, &n| {
            let out = parking_lot::Mutex::new(vec![0u64; n]);
            b.iter(|| {
                parallel_for_default(0, n, |i| {
                    out.lock()[i] = black_box(i as u64);
                });
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parallel_for);
criterion_main!(benches);
