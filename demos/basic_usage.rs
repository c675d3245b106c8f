// Run `cargo run --example basic_usage` to execute this example
// Set DEBUG_FE_FUSION=true to see the data-quality warnings as log lines

use std::error::Error;
use std::sync::Arc;

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::{ident, SessionContext};

use fe_fusion::target::Target;
use fe_fusion::transformers::categorical_encoding::TargetEncoder;
use fe_fusion::transformers::imputation::{Imputer, ImputerConfig, StrategyKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("City", DataType::Utf8, true),
        Field::new("Rain", DataType::Int64, true),
    ]));
    let train = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["A", "A", "B", "B", "B", "C", "C", "C"])),
            Arc::new(Int64Array::from(vec![
                Some(103),
                None,
                Some(90),
                Some(75),
                Some(130),
                Some(200),
                None,
                Some(127),
            ])),
        ],
    )?;
    let test = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec![Some("A"), Some("D"), None])),
            Arc::new(Int64Array::from(vec![Some(110), None, Some(95)])),
        ],
    )?;
    let ctx = SessionContext::new();
    let train_df = ctx.read_batch(train)?;
    let test_df = ctx.read_batch(test)?;

    // Fill missing rainfall with the training median.
    let mut imputer = Imputer::new(
        ImputerConfig::new()
            .with_features("Rain")
            .with_strategy(StrategyKind::Median),
    )?;
    let train_df = imputer.fit_transform(train_df).await?;
    let test_df = imputer.transform(test_df)?;

    // Encode the city with the smoothed mean rainfall.
    let mut encoder = TargetEncoder::new(2.0, "City")?;
    let y = Target::from(train_df.clone().select(vec![ident("Rain")])?);
    encoder.fit(&train_df, &y).await?;
    let encoded = encoder.transform(test_df).await?;

    for diagnostic in &encoded.diagnostics {
        println!("warning: {}", diagnostic);
    }
    encoded.frame.show().await?;

    Ok(())
}
