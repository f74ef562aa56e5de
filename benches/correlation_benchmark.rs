#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
//! Benchmark for pairwise factor correlation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use factor_viz::correlation::correlate;
use factor_viz::prelude::*;

fn matrix(samples: usize, factors: usize) -> FactorMatrix {
    let sample_names = (0..samples).map(|i| format!("s{i}")).collect();
    let factor_names = (1..=factors).map(|k| format!("Factor{k}")).collect();
    let values = (0..samples * factors)
        .map(|i| {
            let (row, col) = (i / factors, i % factors);
            ((row as f32) * 0.013 * (col as f32 + 1.0)).sin() + (i % 7) as f32 * 0.1
        })
        .collect();
    FactorMatrix::new(sample_names, factor_names, values).unwrap()
}

fn correlation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");
    let data = matrix(500, 15);

    for method in [
        CorrelationMethod::Pearson,
        CorrelationMethod::Spearman,
        CorrelationMethod::Kendall,
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(method), &method, |b, &method| {
            b.iter(|| correlate(black_box(&data), method));
        });
    }

    group.finish();
}

criterion_group!(benches, correlation_benchmark);
criterion_main!(benches);
