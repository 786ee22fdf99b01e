// sptl: cost estimator read/write benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sptl::estimator::Estimator;

fn bench_is_small(c: &mut Criterion) {
    let est = Estimator::new("bench::is_small");
    sptl::timer::set_cpu_frequency_ghz(3.0);
    est.report(1000, 50_000, &sptl::config::RuntimeParams::defaults());

    let mut group = c.benchmark_group("estimator_is_small");
    for complexity in [10u64, 1_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("complexity", complexity),
            &complexity,
            |b, &complexity| {
                b.iter(|| {
                    black_box(est.is_small(black_box(complexity), &sptl::config::RuntimeParams::defaults()))
                });
            },
        );
    }
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let est = Estimator::new("bench::report");
    sptl::timer::set_cpu_frequency_ghz(3.0);
    c.bench_function("estimator_report", |b| {
        b.iter(|| {
            est.report(
                black_box(100),
                black_box(40_000),
                &sptl::config::RuntimeParams::defaults(),
            )
        });
    });
}

criterion_group!(benches, bench_is_small, bench_report);
criterion_main!(benches);
