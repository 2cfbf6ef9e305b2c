use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use churn_pipeline::data::{generate_customer_data, GeneratorConfig};
use churn_pipeline::inference::ChurnPredictor;
use churn_pipeline::preprocessing::{target_to_vector, FeaturePreprocessor};
use churn_pipeline::training::{Classifier, ModelKind};
use ndarray::{Array1, Array2};
use polars::prelude::*;

fn customer_data(n_rows: usize) -> DataFrame {
    generate_customer_data(&GeneratorConfig::default().with_rows(n_rows)).unwrap()
}

fn feature_matrix(df: &DataFrame) -> (FeaturePreprocessor, Array2<f64>, Array1<f64>) {
    let mut preprocessor = FeaturePreprocessor::new();
    let processed = preprocessor.fit_transform(df).unwrap();
    let (features, target) = FeaturePreprocessor::split_features_target(&processed, "churn").unwrap();
    let x = preprocessor.to_matrix(&features).unwrap();
    let y = target_to_vector(&target).unwrap();
    (preprocessor, x, y)
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");

    for n_rows in [1000, 10000].iter() {
        let df = customer_data(*n_rows);

        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &df, |b, df| {
            b.iter(|| {
                let mut preprocessor = FeaturePreprocessor::new();
                preprocessor.fit_transform(black_box(df)).unwrap()
            })
        });

        let (preprocessor, _, _) = feature_matrix(&df);
        let raw = df.drop("churn").unwrap();
        group.bench_with_input(BenchmarkId::new("transform", n_rows), &raw, |b, raw| {
            b.iter(|| preprocessor.transform(black_box(raw)).unwrap())
        });
    }

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let df = customer_data(1000);
    let (_, x, y) = feature_matrix(&df);

    for kind in ModelKind::ROSTER {
        group.bench_function(BenchmarkId::new("fit", kind.name()), |b| {
            b.iter(|| {
                let mut model = kind.build(42);
                model.fit(black_box(&x), black_box(&y)).unwrap();
                model
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let train_df = customer_data(2000);
    let (preprocessor, x, y) = feature_matrix(&train_df);
    let mut model = ModelKind::RandomForest.build(42);
    model.fit(&x, &y).unwrap();
    let predictor = ChurnPredictor::new(preprocessor, model).unwrap();

    for n_rows in [100, 1000].iter() {
        let test_df = customer_data(*n_rows).drop("churn").unwrap();

        group.bench_with_input(BenchmarkId::new("predict_frame", n_rows), &test_df, |b, df| {
            b.iter(|| predictor.predict_frame(black_box(df)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_preprocessing, bench_training, bench_prediction);
criterion_main!(benches);
