//! # Categorical Encoding Transformers
//!
//! This module provides two strategies to transform categorical columns:
//!
//! - **TargetEncoder:** Replaces each category with the smoothed mean of a target variable.
//! - **OneHotEncoder:** Expands each categorical column into one indicator column per distinct value.
//!
//! Both encoders expose a constructor, an asynchronous `fit` method and an asynchronous
//! `transform` method, and implement [`Transformer`]. Errors from underlying DataFusion
//! operations are wrapped in [`FeFusionError`].
//!
//! ## Target encoding
//!
//! For a category seen `n` times with target mean `m`, and a global target mean `g`, the
//! encoding is
//!
//! ```text
//! (n * m + smoothing * g) / (n + smoothing)
//! ```
//!
//! Rare categories are pulled towards `g`; frequent ones approach `m`. A smoothing of zero
//! yields the raw group mean. Categories that were not seen during `fit` (including nulls)
//! are encoded as `g`.

use crate::diagnostics::{Diagnostic, Transformed};
use crate::exceptions::{FeFusionError, FeFusionResult};
use crate::features::FeatureNames;
use crate::target::{attach_target, Target, TARGET_COLUMN};
use crate::transformer::Transformer;
use crate::transformers::{coalesce_expr, collect_scalar, rewrite_columns, validate_columns};
use arrow::array::{new_empty_array, Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::common::JoinType;
use datafusion::functions_aggregate::expr_fn::{avg, count};
use datafusion::functions_window::expr_fn::row_number;
use datafusion::logical_expr::{cast, ident, lit, Case as DFCase, Expr};
use datafusion::prelude::{DataFrame, SessionContext};
use datafusion::scalar::ScalarValue;
use futures::future::try_join_all;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Column holding the input row position while lookups are joined in.
const ROW_INDEX: &str = "__fe_fusion_row";

fn lookup_key_column(i: usize) -> String {
    format!("__fe_fusion_key_{}", i)
}

fn lookup_encoding_column(i: usize) -> String {
    format!("__fe_fusion_encoding_{}", i)
}

/// Materialises a fitted lookup table as a two-column DataFrame (`key`, `encoding`)
/// that can be left-joined against the feature column.
fn lookup_frame(mapping: &FeatureMapping, key: &str, encoding: &str) -> FeFusionResult<DataFrame> {
    let keys: ArrayRef = if mapping.table.is_empty() {
        new_empty_array(&mapping.dtype)
    } else {
        ScalarValue::iter_to_array(mapping.table.iter().map(|(category, _)| category.clone()))?
    };
    let encodings: ArrayRef = Arc::new(Float64Array::from(
        mapping
            .table
            .iter()
            .map(|(_, encoding)| *encoding)
            .collect::<Vec<_>>(),
    ));
    let schema = Arc::new(Schema::new(vec![
        Field::new(key, mapping.dtype.clone(), true),
        Field::new(encoding, DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(schema, vec![keys, encodings])?;
    Ok(SessionContext::new().read_batch(batch)?.alias(key)?)
}

/// `CASE WHEN predicate THEN 1 ELSE 0 END` as an Int32 indicator.
fn indicator_expr(predicate: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(predicate), Box::new(lit(1_i32)))],
        else_expr: Some(Box::new(lit(0_i32))),
    })
}

/// Extract the distinct non-null values of a column, sorted, and whether the column has nulls.
async fn extract_distinct_values(
    df: &DataFrame,
    col_name: &str,
) -> FeFusionResult<(Vec<ScalarValue>, bool)> {
    let distinct_df = df.clone().select(vec![ident(col_name)])?.distinct()?;
    let batches = distinct_df
        .collect()
        .await
        .map_err(FeFusionError::from)?;
    let mut values = Vec::new();
    let mut has_null = false;
    for batch in batches {
        let array = batch.column(0);
        for i in 0..array.len() {
            if array.is_null(i) {
                has_null = true;
            } else {
                values.push(ScalarValue::try_from_array(array, i)?);
            }
        }
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Ok((values, has_null))
}

/// ------------------------- TargetEncoder -------------------------
///
/// What `fit` learned for one feature: the category lookup table and the column type it was learned on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMapping {
    /// Category -> smoothed encoding, sorted by category.
    pub table: Vec<(ScalarValue, f64)>,
    /// Type of the feature column at fit time; `transform` casts mismatching columns to it.
    pub dtype: DataType,
}

impl FeatureMapping {
    /// Looks up the encoding of a category.
    pub fn encoding(&self, category: &ScalarValue) -> Option<f64> {
        self.table
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, encoding)| *encoding)
    }
}

/// TargetEncoder replaces each category with a smoothed mean of the target.
#[derive(Debug, Clone)]
pub struct TargetEncoder {
    pub smoothing: f64,
    pub features: FeatureNames,
    global_mean: Option<f64>,
    mapping: HashMap<String, FeatureMapping>,
}

impl TargetEncoder {
    /// Create a new TargetEncoder. `smoothing` must be finite and non-negative.
    pub fn new(smoothing: f64, features: impl Into<FeatureNames>) -> FeFusionResult<Self> {
        if !smoothing.is_finite() || smoothing < 0.0 {
            return Err(FeFusionError::InvalidParameter(format!(
                "smoothing must be a finite non-negative number, got {}",
                smoothing
            )));
        }
        Ok(Self {
            smoothing,
            features: features.into(),
            global_mean: None,
            mapping: HashMap::new(),
        })
    }

    /// Target mean over all training rows; `None` before `fit`.
    pub fn global_mean(&self) -> Option<f64> {
        self.global_mean
    }

    /// Learned lookup tables, one per feature.
    pub fn mapping(&self) -> &HashMap<String, FeatureMapping> {
        &self.mapping
    }

    /// Flags numeric features whose share of distinct values (nulls included) exceeds one half.
    async fn check_features_unique_values(&self, x: &DataFrame) -> FeFusionResult<Vec<Diagnostic>> {
        let height = x.clone().count().await?;
        if height == 0 {
            return Ok(Vec::new());
        }
        let mut diagnostics = Vec::new();
        for feature in &self.features {
            let field = x.schema().field_with_unqualified_name(feature)?;
            if !field.data_type().is_numeric() {
                continue;
            }
            let n_unique = x
                .clone()
                .select(vec![ident(feature)])?
                .distinct()?
                .count()
                .await?;
            if n_unique as f64 / height as f64 > 0.5 {
                diagnostics.push(Diagnostic::PossiblyNumerical {
                    feature: feature.clone(),
                });
            }
        }
        Ok(diagnostics)
    }

    /// Learn the global target mean and the smoothed per-category encodings.
    /// Previous state is replaced, not accumulated.
    pub async fn fit(&mut self, x: &DataFrame, y: &Target) -> FeFusionResult<Vec<Diagnostic>> {
        validate_columns(x, &self.features)?;
        let diagnostics = self.check_features_unique_values(x).await?;
        diagnostics.iter().for_each(Diagnostic::emit);

        let values = y.materialize().await?;
        let data = attach_target(x, &self.features, values).await?;
        let target = cast(ident(TARGET_COLUMN), DataType::Float64);

        let global_mean = match collect_scalar(
            data.clone()
                .aggregate(vec![], vec![avg(target.clone()).alias("mean")])?,
        )
        .await?
        {
            ScalarValue::Float64(Some(mean)) => mean,
            _ => {
                return Err(FeFusionError::EmptyColumn(format!(
                    "Target '{}' has no non-null values",
                    y.name()?
                )))
            }
        };

        let mut mapping = HashMap::new();
        for feature in &self.features {
            let dtype = data
                .schema()
                .field_with_unqualified_name(feature)?
                .data_type()
                .clone();
            let group_count = cast(ident("count"), DataType::Float64);
            let smoothed = data
                .clone()
                .aggregate(
                    vec![ident(feature)],
                    vec![
                        count(lit(1)).alias("count"),
                        avg(target.clone()).alias("mean"),
                    ],
                )?
                .select(vec![
                    ident(feature),
                    ((group_count.clone() * ident("mean") + lit(self.smoothing * global_mean))
                        / (group_count + lit(self.smoothing)))
                    .alias("encoding"),
                ])?;
            let batches = smoothed.collect().await.map_err(FeFusionError::from)?;

            let mut table = Vec::new();
            for batch in batches {
                let encoding_array = batch
                    .column(1)
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| {
                        FeFusionError::DataFusionError(datafusion::error::DataFusionError::Plan(
                            format!("Expected Float64 encodings for column {}", feature),
                        ))
                    })?;
                for i in 0..batch.num_rows() {
                    // Null categories never match at lookup time, and a null encoding
                    // (no non-null target in the group) falls back to the global mean.
                    if batch.column(0).is_null(i) || encoding_array.is_null(i) {
                        continue;
                    }
                    let category = ScalarValue::try_from_array(batch.column(0), i)?;
                    table.push((category, encoding_array.value(i)));
                }
            }
            table.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            debug!(
                feature = feature.as_str(),
                categories = table.len(),
                %dtype,
                "fitted target encoding"
            );
            mapping.insert(feature.clone(), FeatureMapping { table, dtype });
        }

        debug!(global_mean, smoothing = self.smoothing, "fitted target encoder");
        self.global_mean = Some(global_mean);
        self.mapping = mapping;
        Ok(diagnostics)
    }

    /// Replace every encoded feature with its learned encoding.
    ///
    /// Columns whose type differs from the fit-time type are cast first. Each lookup table is
    /// left-joined on its feature, and rows are put back in input order afterwards. Unseen
    /// categories and nulls are filled with the global mean. Other columns and the column
    /// order are kept.
    pub async fn transform(&self, x: DataFrame) -> FeFusionResult<Transformed> {
        let global_mean = self.global_mean.ok_or(FeFusionError::FitNotCalled)?;
        let encoded: Vec<String> = self
            .features
            .iter()
            .filter(|f| self.mapping.contains_key(*f))
            .cloned()
            .collect();
        validate_columns(&x, &encoded)?;

        let mut diagnostics = Vec::new();
        for feature in &encoded {
            let mapping = &self.mapping[feature];
            let original = x.schema().field_with_unqualified_name(feature)?.data_type();
            if original != &mapping.dtype {
                diagnostics.push(Diagnostic::DtypeCoerced {
                    feature: feature.clone(),
                    enforced: mapping.dtype.clone(),
                    original: original.clone(),
                });
            }
        }

        let output_columns: Vec<String> = x
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        let coerced: Vec<String> = diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::DtypeCoerced { feature, .. } => Some(feature.clone()),
                _ => None,
            })
            .collect();
        let mut joined = rewrite_columns(x, &coerced, |name| {
            self.mapping
                .get(name)
                .map(|mapping| cast(ident(name), mapping.dtype.clone()))
        })?
        .window(vec![row_number().alias(ROW_INDEX)])?;

        for (i, feature) in encoded.iter().enumerate() {
            let key = lookup_key_column(i);
            let lookup = lookup_frame(&self.mapping[feature], &key, &lookup_encoding_column(i))?;
            joined = joined.join_on(
                lookup,
                JoinType::Left,
                [ident(feature.as_str()).eq(ident(key))],
            )?;
        }
        let joined = joined.sort(vec![ident(ROW_INDEX).sort(true, false)])?;

        let unseen_counts = try_join_all(encoded.iter().enumerate().map(|(i, feature)| {
            let frame = joined.clone();
            async move {
                let n = frame
                    .filter(ident(lookup_encoding_column(i)).is_null())?
                    .count()
                    .await?;
                Ok::<_, FeFusionError>((feature.clone(), n))
            }
        }))
        .await?;
        let unseen: Vec<String> = unseen_counts
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(feature, _)| feature)
            .collect();
        if !unseen.is_empty() {
            diagnostics.push(Diagnostic::UnseenValues { features: unseen });
        }
        diagnostics.iter().for_each(Diagnostic::emit);

        let exprs: Vec<Expr> = output_columns
            .iter()
            .map(|name| match encoded.iter().position(|f| f == name) {
                Some(i) => coalesce_expr(ident(lookup_encoding_column(i)), lit(global_mean))
                    .alias(name),
                None => ident(name),
            })
            .collect();
        let frame = joined.select(exprs)?;
        Ok(Transformed::new(frame, diagnostics))
    }

    /// Fit on `x` and `y`, then transform `x`.
    pub async fn fit_transform(&mut self, x: DataFrame, y: &Target) -> FeFusionResult<Transformed> {
        let mut diagnostics = self.fit(&x, y).await?;
        let transformed = self.transform(x).await?;
        diagnostics.extend(transformed.diagnostics);
        Ok(Transformed::new(transformed.frame, diagnostics))
    }
}

#[async_trait]
impl Transformer for TargetEncoder {
    async fn fit(
        &mut self,
        x: &DataFrame,
        y: Option<&Target>,
    ) -> FeFusionResult<Vec<Diagnostic>> {
        let y = y.ok_or_else(|| {
            FeFusionError::InvalidParameter("TargetEncoder requires a target to fit".to_string())
        })?;
        TargetEncoder::fit(self, x, y).await
    }

    async fn transform(&self, x: DataFrame) -> FeFusionResult<Transformed> {
        TargetEncoder::transform(self, x).await
    }

    fn is_stateful(&self) -> bool {
        true
    }
}

/// ------------------------- OneHotEncoder -------------------------
///
/// What happens to the source column after its indicator columns are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OneHotStrategy {
    Keep,
    #[default]
    Drop,
}

impl FromStr for OneHotStrategy {
    type Err = FeFusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(OneHotStrategy::Keep),
            "drop" => Ok(OneHotStrategy::Drop),
            _ => Err(FeFusionError::InvalidParameter(
                "strategy must be one of ['keep', 'drop']".to_string(),
            )),
        }
    }
}

impl fmt::Display for OneHotStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OneHotStrategy::Keep => write!(f, "keep"),
            OneHotStrategy::Drop => write!(f, "drop"),
        }
    }
}

/// OneHotEncoder appends one Int32 indicator column per distinct value of each feature,
/// named `{feature}_{value}` (and `{feature}_null` when the column has nulls).
/// Categories are read from the table being transformed, so `fit` learns nothing.
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    pub features: FeatureNames,
    pub strategy: OneHotStrategy,
}

impl OneHotEncoder {
    /// Create a new OneHotEncoder for the specified columns.
    pub fn new(features: impl Into<FeatureNames>, strategy: OneHotStrategy) -> Self {
        Self {
            features: features.into(),
            strategy,
        }
    }

    /// Create a new OneHotEncoder from a strategy name (`"keep"` or `"drop"`).
    pub fn with_strategy_name(
        features: impl Into<FeatureNames>,
        strategy: &str,
    ) -> FeFusionResult<Self> {
        Ok(Self::new(features, strategy.parse()?))
    }

    /// This transformer is stateless, so fit only checks the columns exist.
    pub async fn fit(&mut self, x: &DataFrame) -> FeFusionResult<()> {
        validate_columns(x, &self.features)
    }

    /// Transform the DataFrame by adding indicator columns, feature by feature.
    pub async fn transform(&self, x: DataFrame) -> FeFusionResult<DataFrame> {
        validate_columns(&x, &self.features)?;
        let mut frame = x;
        for feature in &self.features {
            let (values, has_null) = extract_distinct_values(&frame, feature).await?;
            let kept: Vec<String> = frame
                .schema()
                .fields()
                .iter()
                .filter(|field| {
                    !(self.strategy == OneHotStrategy::Drop && field.name() == feature)
                })
                .map(|field| field.name().clone())
                .collect();
            let mut names: HashSet<String> = kept.iter().cloned().collect();
            let mut exprs: Vec<Expr> = kept.iter().map(ident).collect();

            let mut indicators: Vec<(String, Expr)> = values
                .into_iter()
                .map(|value| {
                    (
                        format!("{}_{}", feature, value),
                        ident(feature).eq(lit(value)),
                    )
                })
                .collect();
            if has_null {
                indicators.push((format!("{}_null", feature), ident(feature).is_null()));
            }
            for (name, predicate) in indicators {
                if !names.insert(name.clone()) {
                    return Err(FeFusionError::InvalidParameter(format!(
                        "One-hot column '{}' for feature '{}' clashes with an existing column",
                        name, feature
                    )));
                }
                exprs.push(indicator_expr(predicate).alias(name));
            }
            frame = frame.select(exprs).map_err(FeFusionError::from)?;
        }
        Ok(frame)
    }
}

#[async_trait]
impl Transformer for OneHotEncoder {
    async fn fit(
        &mut self,
        x: &DataFrame,
        _y: Option<&Target>,
    ) -> FeFusionResult<Vec<Diagnostic>> {
        OneHotEncoder::fit(self, x).await?;
        Ok(Vec::new())
    }

    async fn transform(&self, x: DataFrame) -> FeFusionResult<Transformed> {
        OneHotEncoder::transform(self, x).await.map(Transformed::clean)
    }

    fn is_stateful(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_strategy_parsing() {
        assert_eq!("keep".parse::<OneHotStrategy>().unwrap(), OneHotStrategy::Keep);
        assert_eq!("drop".parse::<OneHotStrategy>().unwrap(), OneHotStrategy::Drop);
        let err = "bad-strategy".parse::<OneHotStrategy>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter: strategy must be one of ['keep', 'drop']"
        );
    }

    #[test]
    fn test_target_encoder_rejects_negative_smoothing() {
        assert!(TargetEncoder::new(-1.0, "City").is_err());
        assert!(TargetEncoder::new(f64::NAN, "City").is_err());
        assert!(TargetEncoder::new(0.0, "City").is_ok());
    }

    #[tokio::test]
    async fn test_empty_lookup_frame_has_typed_key() {
        let mapping = FeatureMapping {
            table: Vec::new(),
            dtype: DataType::Int64,
        };
        let frame = lookup_frame(&mapping, "k", "e").unwrap();
        assert_eq!(
            frame.schema().field_with_unqualified_name("k").unwrap().data_type(),
            &DataType::Int64
        );
        assert_eq!(frame.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lookup_frame_rows() {
        let mapping = FeatureMapping {
            table: vec![
                (ScalarValue::from("A"), 117.875),
                (ScalarValue::from("B"), 100.0),
            ],
            dtype: DataType::Utf8,
        };
        let frame = lookup_frame(&mapping, "k", "e").unwrap();
        assert_eq!(frame.count().await.unwrap(), 2);
    }

    #[test]
    fn test_feature_mapping_lookup() {
        let mapping = FeatureMapping {
            table: vec![
                (ScalarValue::from("A"), 117.875),
                (ScalarValue::from("B"), 100.0),
            ],
            dtype: DataType::Utf8,
        };
        assert_eq!(mapping.encoding(&ScalarValue::from("A")), Some(117.875));
        assert_eq!(mapping.encoding(&ScalarValue::from("Z")), None);
    }
}
