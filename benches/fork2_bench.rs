// sptl: fork2 overhead benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sptl::fork2;

fn fib(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let (a, b) = fork2(|| fib(n - 1), || fib(n - 2));
    a + b
}

fn bench_fibonacci(c: &mut Criterion) {
    let mut group = c.benchmark_group("fork2_fibonacci");
    for n in [10u64, 20, 26] {
        group.bench_with_input(BenchmarkId::new("n", n), &n, |b, &n| {
            b.iter(|| black_box(fib(black_box(n))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fibonacci);
criterion_main!(benches);
