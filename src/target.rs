//! ## Target variables
//!
//! Supervised transformers (such as target encoding) take the target either as a
//! single-column DataFrame or as a named Arrow array. Both are materialised into one
//! array and attached, row for row, to the feature columns before fitting.

use crate::exceptions::{FeFusionError, FeFusionResult};
use arrow::array::{new_empty_array, Array, ArrayRef};
use arrow::compute::{concat, concat_batches};
use arrow::datatypes::{Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::{ident, DataFrame, SessionContext};
use std::sync::Arc;

/// Internal name of the target column once attached to the features.
pub(crate) const TARGET_COLUMN: &str = "__fe_fusion_target";

/// The target a supervised transformer is fitted against.
#[derive(Clone)]
pub enum Target {
    /// A DataFrame whose first column is the target.
    Frame(DataFrame),
    /// A named one-dimensional array.
    Series { name: String, values: ArrayRef },
}

impl Target {
    /// Creates a target from a named array.
    pub fn series(name: impl Into<String>, values: ArrayRef) -> Self {
        Target::Series {
            name: name.into(),
            values,
        }
    }

    /// Name of the target column.
    pub fn name(&self) -> FeFusionResult<String> {
        match self {
            Target::Frame(df) => df
                .schema()
                .fields()
                .first()
                .map(|f| f.name().clone())
                .ok_or_else(|| {
                    FeFusionError::InvalidParameter("Target DataFrame has no columns".to_string())
                }),
            Target::Series { name, .. } => Ok(name.clone()),
        }
    }

    /// Collects the target values into a single array.
    pub(crate) async fn materialize(&self) -> FeFusionResult<ArrayRef> {
        match self {
            Target::Series { values, .. } => Ok(values.clone()),
            Target::Frame(df) => {
                let name = self.name()?;
                let data_type = df.schema().field_with_unqualified_name(&name)?.data_type().clone();
                let batches = df.clone().select(vec![ident(&name)])?.collect().await?;
                let arrays: Vec<&dyn Array> = batches.iter().map(|b| b.column(0).as_ref()).collect();
                if arrays.is_empty() {
                    return Ok(new_empty_array(&data_type));
                }
                Ok(concat(&arrays)?)
            }
        }
    }
}

impl From<DataFrame> for Target {
    fn from(df: DataFrame) -> Self {
        Target::Frame(df)
    }
}

/// Builds a new in-memory DataFrame holding `features` from `x` with `target` appended
/// as [`TARGET_COLUMN`]. Rows are matched by position.
pub(crate) async fn attach_target(
    x: &DataFrame,
    features: &[String],
    target: ArrayRef,
) -> FeFusionResult<DataFrame> {
    let selected = x.clone().select(features.iter().map(|f| ident(f.as_str())).collect())?;
    let planned_schema = selected.schema().inner().clone();
    let batches = selected.collect().await?;
    let schema = batches
        .first()
        .map(|b| b.schema())
        .unwrap_or(planned_schema);
    let features_batch = concat_batches(&schema, &batches)?;

    if features_batch.num_rows() != target.len() {
        return Err(FeFusionError::InvalidParameter(format!(
            "Target has {} rows but the feature table has {}",
            target.len(),
            features_batch.num_rows()
        )));
    }

    let mut fields: Vec<FieldRef> = features_batch.schema().fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(
        TARGET_COLUMN,
        target.data_type().clone(),
        true,
    )));
    let mut columns = features_batch.columns().to_vec();
    columns.push(target);

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    Ok(SessionContext::new().read_batch(batch)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, StringArray};

    fn frame() -> DataFrame {
        let schema = Arc::new(Schema::new(vec![
            Field::new("City", arrow::datatypes::DataType::Utf8, true),
            Field::new("Rain", arrow::datatypes::DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["A", "B", "C"])),
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
            ],
        )
        .unwrap();
        SessionContext::new().read_batch(batch).unwrap()
    }

    #[tokio::test]
    async fn test_frame_target_uses_first_column() {
        let df = frame();
        let rain = df.clone().select(vec![ident("Rain")]).unwrap();
        let target = Target::from(rain);
        assert_eq!(target.name().unwrap(), "Rain");
        let values = target.materialize().await.unwrap();
        assert_eq!(values.len(), 3);
    }

    #[tokio::test]
    async fn test_attach_target_rejects_length_mismatch() {
        let df = frame();
        let values: ArrayRef = Arc::new(Float64Array::from(vec![1.0, 2.0]));
        let err = attach_target(&df, &["City".to_string()], values)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FeFusionError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_attach_target_appends_column() {
        let df = frame();
        let values: ArrayRef = Arc::new(Float64Array::from(vec![4.0, 5.0, 6.0]));
        let joined = attach_target(&df, &["City".to_string()], values)
            .await
            .unwrap();
        let names: Vec<String> = joined
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["City".to_string(), TARGET_COLUMN.to_string()]);
    }
}
