//! Benchmarks for the drift test and classifier fit.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use sensorflow::data::label_column;
use sensorflow::ml::{ks_2samp, Classifier, FeatureTransformer, LogisticRegression, TargetEncoder};
use sensorflow::testing::fixtures::TARGET_COLUMN;
use sensorflow::testing::SensorFrameBuilder;

fn ks_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("ks_2samp");
    for size in [1_000usize, 10_000] {
        let a: Vec<f64> = (0..size).map(|i| (i as f64 * 0.618).fract()).collect();
        let b: Vec<f64> = (0..size).map(|i| (i as f64 * 0.414).fract() + 0.01).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| ks_2samp(black_box(&a), black_box(&b)));
        });
    }
    group.finish();
}

fn training_set(rows: usize) -> (Array2<f64>, Array1<f64>) {
    let builder = SensorFrameBuilder::new().rows(rows).features(20);
    let frame = builder.build().expect("synthetic frame");
    let transformer = FeatureTransformer::fit(&frame, &builder.feature_names()).expect("fit transformer");
    let labels = label_column(&frame, TARGET_COLUMN).expect("label column");
    let encoder = TargetEncoder::fit(&labels).expect("fit encoder");
    let x = transformer.transform(&frame).expect("transform");
    let y = Array1::from(encoder.transform(&labels).expect("encode"));
    (x, y)
}

fn classifier_benchmark(c: &mut Criterion) {
    let (x, y) = training_set(2_000);
    c.bench_function("logistic_regression_fit", |bench| {
        bench.iter(|| {
            let mut model = LogisticRegression::default();
            model.fit(black_box(&x), black_box(&y)).expect("fit");
            model
        });
    });
}

criterion_group!(benches, ks_benchmark, classifier_benchmark);
criterion_main!(benches);
