use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{criterion_group, criterion_main, Criterion};
use datafusion::prelude::{DataFrame, SessionContext};
use tokio::runtime::Runtime;

use fe_fusion::target::Target;
use fe_fusion::transformers::categorical_encoding::TargetEncoder;
use fe_fusion::transformers::imputation::{Imputer, ImputerConfig, StrategyKind};

const ROWS: usize = 100_000;
const CATEGORIES: usize = 50;
const HIGH_CARDINALITY: usize = 20_000;

fn build_frame(categories: usize) -> (DataFrame, ArrayRef) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("category", DataType::Utf8, true),
        Field::new("value", DataType::Float64, true),
    ]));
    let categories: Vec<String> = (0..ROWS)
        .map(|i| format!("c{}", i % categories))
        .collect();
    let values: Vec<Option<f64>> = (0..ROWS)
        .map(|i| if i % 7 == 0 { None } else { Some(i as f64) })
        .collect();
    let target: ArrayRef = Arc::new(Float64Array::from(
        (0..ROWS).map(|i| (i % 13) as f64).collect::<Vec<_>>(),
    ));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(categories)),
            Arc::new(Float64Array::from(values)),
        ],
    )
    .expect("valid batch");
    let df = SessionContext::new()
        .read_batch(batch)
        .expect("in-memory frame");
    (df, target)
}

fn bench_target_encoder(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    for (name, categories) in [
        ("target_encoder_fit_transform", CATEGORIES),
        ("target_encoder_fit_transform_high_cardinality", HIGH_CARDINALITY),
    ] {
        let (df, target) = build_frame(categories);
        let y = Target::series("target", target);

        c.bench_function(name, |b| {
            b.iter(|| {
                rt.block_on(async {
                    let mut encoder = TargetEncoder::new(10.0, "category").unwrap();
                    let transformed = encoder.fit_transform(df.clone(), &y).await.unwrap();
                    transformed.frame.collect().await.unwrap()
                })
            })
        });
    }
}

fn bench_imputer(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let (df, _) = build_frame(CATEGORIES);

    c.bench_function("median_imputer_fit_transform", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut imputer = Imputer::new(
                    ImputerConfig::new()
                        .with_features("value")
                        .with_strategy(StrategyKind::Median),
                )
                .unwrap();
                imputer.fit_transform(df.clone()).await.unwrap().collect().await.unwrap()
            })
        })
    });
}

criterion_group!(benches, bench_target_encoder, bench_imputer);
criterion_main!(benches);
