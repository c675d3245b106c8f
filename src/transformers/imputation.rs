//! ## Transformers for imputing missing values
//!
//! This module provides transformers (or imputers) that replace nulls with a value learned
//! from the training data.
//!
//! Currently, the following transformers are implemented:
//!
//! - **Imputer**: Imputes each configured feature with its own strategy: mean, median, mode,
//!   max, min or a fixed value. Without an explicit feature list it imputes every numeric
//!   column that contains nulls.
//! - **MeanImputer**: Imputes the given numeric columns with their mean.
//! - **MostFrequentImputer**: Imputes the given columns with their most frequent value.
//!
//! Each transformer returns a new DataFrame where only the nulls of the imputed columns change.
//! Errors are returned as `FeFusionError` and results are wrapped in `FeFusionResult`.
//!
//! ### Mode
//!
//! The mode is the most frequent non-null value; ties go to the largest value. Nulls are
//! never candidates, so a column with more nulls than any single value still gets a
//! non-null fill value.

use crate::exceptions::{FeFusionError, FeFusionResult};
use crate::features::FeatureNames;
use crate::transformers::{coalesce_expr, collect_scalar, rewrite_columns, validate_columns};
use arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{avg, count, max, median, min};
use datafusion::logical_expr::{cast, ident, lit, Expr};
use datafusion::prelude::DataFrame;
use datafusion::scalar::ScalarValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Name of an imputation strategy, as written in a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Mean,
    Median,
    Mode,
    Max,
    Min,
    FixedValue,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::Mean,
        StrategyKind::Median,
        StrategyKind::Mode,
        StrategyKind::Max,
        StrategyKind::Min,
        StrategyKind::FixedValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Mean => "mean",
            StrategyKind::Median => "median",
            StrategyKind::Mode => "mode",
            StrategyKind::Max => "max",
            StrategyKind::Min => "min",
            StrategyKind::FixedValue => "fixed_value",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = FeFusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<String> = StrategyKind::ALL
                    .iter()
                    .map(|kind| format!("'{}'", kind))
                    .collect();
                FeFusionError::InvalidParameter(format!(
                    "strategy must be one of [{}]",
                    names.join(", ")
                ))
            })
    }
}

/// A resolved imputation strategy, carrying whatever it needs to compute its fill value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    Median,
    Mode,
    Max,
    Min,
    FixedValue(f64),
}

impl ImputeStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ImputeStrategy::Mean => StrategyKind::Mean,
            ImputeStrategy::Median => StrategyKind::Median,
            ImputeStrategy::Mode => StrategyKind::Mode,
            ImputeStrategy::Max => StrategyKind::Max,
            ImputeStrategy::Min => StrategyKind::Min,
            ImputeStrategy::FixedValue(_) => StrategyKind::FixedValue,
        }
    }
}

/// Which features an [`Imputer`] fills, and how.
#[derive(Debug, Clone, PartialEq)]
pub enum ImputePlan {
    /// Exactly these (feature, strategy) pairs.
    Explicit(Vec<(String, ImputeStrategy)>),
    /// Every numeric column holding at least one null at fit time, with one strategy.
    AutoDiscover(ImputeStrategy),
}

/// Options accepted by [`Imputer`].
///
/// `strategy_dict` cannot be combined with any other option. `fixed_value` is only meaningful
/// with the `fixed_value` strategy (and implies it when `strategy` is unset). With neither
/// `features_to_impute` nor `strategy_dict`, the features are discovered at fit time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImputerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_to_impute: Option<FeatureNames>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_dict: Option<BTreeMap<String, ImputeStrategy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_value: Option<f64>,
}

fn check_fixed_value(value: f64) -> FeFusionResult<f64> {
    if !value.is_finite() {
        return Err(FeFusionError::InvalidParameter(format!(
            "Fixed value {} must be finite",
            value
        )));
    }
    Ok(value)
}

impl ImputerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object such as `{"features_to_impute": ["Rain"], "strategy": "median"}`.
    /// Unknown keys and unknown strategy names are rejected.
    pub fn from_json(json: &str) -> FeFusionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_features(mut self, features: impl Into<FeatureNames>) -> Self {
        self.features_to_impute = Some(features.into());
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_strategy_dict<I, S>(mut self, strategies: I) -> Self
    where
        I: IntoIterator<Item = (S, ImputeStrategy)>,
        S: Into<String>,
    {
        self.strategy_dict = Some(
            strategies
                .into_iter()
                .map(|(feature, strategy)| (feature.into(), strategy))
                .collect(),
        );
        self
    }

    pub fn with_fixed_value(mut self, value: f64) -> Self {
        self.fixed_value = Some(value);
        self
    }

    /// Checks every combination of options and resolves them into an [`ImputePlan`].
    pub fn validate(&self) -> FeFusionResult<ImputePlan> {
        if let Some(dict) = &self.strategy_dict {
            if self.features_to_impute.is_some()
                || self.strategy.is_some()
                || self.fixed_value.is_some()
            {
                return Err(FeFusionError::InvalidParameter(
                    "Cannot use 'strategy_dict' with 'features_to_impute' or 'strategy' or 'fixed_value'"
                        .to_string(),
                ));
            }
            let mut pairs = Vec::with_capacity(dict.len());
            for (feature, strategy) in dict {
                if let ImputeStrategy::FixedValue(value) = strategy {
                    check_fixed_value(*value)?;
                }
                pairs.push((feature.clone(), *strategy));
            }
            return Ok(ImputePlan::Explicit(pairs));
        }

        let strategy = match (self.strategy, self.fixed_value) {
            (None, None) => ImputeStrategy::Mean,
            (None, Some(value)) | (Some(StrategyKind::FixedValue), Some(value)) => {
                ImputeStrategy::FixedValue(check_fixed_value(value)?)
            }
            (Some(StrategyKind::FixedValue), None) => {
                return Err(FeFusionError::InvalidParameter(
                    "strategy 'fixed_value' requires 'fixed_value' to be set".to_string(),
                ))
            }
            (Some(kind), Some(_)) => {
                return Err(FeFusionError::InvalidParameter(format!(
                    "'fixed_value' can only be used with the 'fixed_value' strategy, not '{}'",
                    kind
                )))
            }
            (Some(StrategyKind::Mean), None) => ImputeStrategy::Mean,
            (Some(StrategyKind::Median), None) => ImputeStrategy::Median,
            (Some(StrategyKind::Mode), None) => ImputeStrategy::Mode,
            (Some(StrategyKind::Max), None) => ImputeStrategy::Max,
            (Some(StrategyKind::Min), None) => ImputeStrategy::Min,
        };

        Ok(match &self.features_to_impute {
            Some(features) => ImputePlan::Explicit(
                features
                    .iter()
                    .map(|feature| (feature.clone(), strategy))
                    .collect(),
            ),
            None => ImputePlan::AutoDiscover(strategy),
        })
    }
}

/// Checks that `strategy` can be applied to a column of type `dtype`.
///
/// Mode works on any discrete type (integers, strings, temporal, binary) but not on floats,
/// decimals or booleans. Every other strategy needs a numeric column.
fn check_strategy_dtype(
    feature: &str,
    strategy: StrategyKind,
    dtype: &DataType,
) -> FeFusionResult<()> {
    match strategy {
        StrategyKind::Mode => {
            if dtype.is_floating()
                || matches!(
                    dtype,
                    DataType::Decimal128(_, _) | DataType::Decimal256(_, _) | DataType::Boolean
                )
            {
                return Err(FeFusionError::UnsupportedType(format!(
                    "dtype `{}` is not supported for mode strategy (feature '{}')",
                    dtype, feature
                )));
            }
        }
        _ => {
            if !dtype.is_numeric() {
                return Err(FeFusionError::UnsupportedType(format!(
                    "{} is not a numerical feature (dtype `{}`)",
                    feature, dtype
                )));
            }
        }
    }
    Ok(())
}

/// Most frequent non-null value of a column, ties broken by the largest value.
async fn compute_mode(df: &DataFrame, col_name: &str) -> FeFusionResult<ScalarValue> {
    let grouped = df
        .clone()
        .filter(ident(col_name).is_not_null())?
        .aggregate(vec![ident(col_name)], vec![count(lit(1)).alias("cnt")])
        .map_err(FeFusionError::from)?
        .sort(vec![
            ident("cnt").sort(false, false),
            ident(col_name).sort(false, false),
        ])
        .map_err(FeFusionError::from)?
        .limit(0, Some(1))
        .map_err(FeFusionError::from)?;
    collect_scalar(grouped).await
}

/// Runs a single global aggregate over a column.
async fn compute_aggregate(df: &DataFrame, aggregate: Expr) -> FeFusionResult<ScalarValue> {
    let agg_df = df
        .clone()
        .aggregate(vec![], vec![aggregate.alias("value")])
        .map_err(FeFusionError::from)?;
    collect_scalar(agg_df).await
}

/// Computes the fill value of `feature` under `strategy`. Mean and median are computed in Float64.
async fn compute_fill_value(
    df: &DataFrame,
    feature: &str,
    strategy: ImputeStrategy,
) -> FeFusionResult<ScalarValue> {
    let dtype = df
        .schema()
        .field_with_unqualified_name(feature)?
        .data_type()
        .clone();
    check_strategy_dtype(feature, strategy.kind(), &dtype)?;

    let as_float = || cast(ident(feature), DataType::Float64);
    let value = match strategy {
        ImputeStrategy::FixedValue(value) => return Ok(ScalarValue::Float64(Some(value))),
        ImputeStrategy::Mean => compute_aggregate(df, avg(as_float())).await?,
        ImputeStrategy::Median => compute_aggregate(df, median(as_float())).await?,
        ImputeStrategy::Max => compute_aggregate(df, max(ident(feature))).await?,
        ImputeStrategy::Min => compute_aggregate(df, min(ident(feature))).await?,
        ImputeStrategy::Mode => compute_mode(df, feature).await?,
    };
    if value.is_null() {
        return Err(FeFusionError::EmptyColumn(format!(
            "Cannot compute {} for feature '{}': the column has no non-null values",
            strategy.kind(),
            feature
        )));
    }
    Ok(value)
}

/// Numeric columns of `df` that contain at least one null.
async fn numeric_columns_with_nulls(df: &DataFrame) -> FeFusionResult<Vec<String>> {
    let mut columns = Vec::new();
    for field in df.schema().fields() {
        if !field.data_type().is_numeric() {
            continue;
        }
        let nulls = df
            .clone()
            .filter(ident(field.name()).is_null())?
            .count()
            .await?;
        if nulls > 0 {
            columns.push(field.name().clone());
        }
    }
    Ok(columns)
}

/// Replaces missing values according to a per-feature strategy.
#[derive(Debug, Clone)]
pub struct Imputer {
    pub plan: ImputePlan,
    /// The (feature, strategy) pairs used by the last `fit`.
    pub fitted_strategies: Vec<(String, ImputeStrategy)>,
    pub impute_values: HashMap<String, ScalarValue>,
    fitted: bool,
}

impl Imputer {
    /// Create a new imputer, rejecting invalid option combinations.
    pub fn new(config: ImputerConfig) -> FeFusionResult<Self> {
        Ok(Self::with_plan(config.validate()?))
    }

    /// Create a new imputer from a JSON configuration object.
    pub fn from_json(json: &str) -> FeFusionResult<Self> {
        Self::new(ImputerConfig::from_json(json)?)
    }

    fn with_plan(plan: ImputePlan) -> Self {
        Self {
            plan,
            fitted_strategies: Vec::new(),
            impute_values: HashMap::new(),
            fitted: false,
        }
    }

    /// Compute one fill value per planned feature. Previous state is discarded.
    pub async fn fit(&mut self, df: &DataFrame) -> FeFusionResult<()> {
        let strategies = match &self.plan {
            ImputePlan::Explicit(pairs) => pairs.clone(),
            ImputePlan::AutoDiscover(strategy) => numeric_columns_with_nulls(df)
                .await?
                .into_iter()
                .map(|feature| (feature, *strategy))
                .collect(),
        };
        let features: Vec<String> = strategies.iter().map(|(f, _)| f.clone()).collect();
        validate_columns(df, &features)?;

        let mut impute_values = HashMap::with_capacity(strategies.len());
        for (feature, strategy) in &strategies {
            let value = compute_fill_value(df, feature, *strategy).await?;
            debug!(
                feature = feature.as_str(),
                strategy = %strategy.kind(),
                value = %value,
                "fitted imputation value"
            );
            impute_values.insert(feature.clone(), value);
        }

        self.fitted_strategies = strategies;
        self.impute_values = impute_values;
        self.fitted = true;
        Ok(())
    }

    /// Returns a new DataFrame where, for each imputed column, nulls are replaced with the fitted value.
    pub fn transform(&self, df: DataFrame) -> FeFusionResult<DataFrame> {
        if !self.fitted {
            return Err(FeFusionError::FitNotCalled);
        }
        let features: Vec<String> = self.impute_values.keys().cloned().collect();
        validate_columns(&df, &features)?;
        rewrite_columns(df, &features, |name| {
            self.impute_values
                .get(name)
                .map(|value| coalesce_expr(ident(name), lit(value.clone())))
        })
    }

    /// Fit on `df` and return it with nulls filled.
    pub async fn fit_transform(&mut self, df: DataFrame) -> FeFusionResult<DataFrame> {
        self.fit(&df).await?;
        self.transform(df)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

crate::impl_transformer!(Imputer);

/// Replaces missing values in the given numeric columns with their mean.
#[derive(Debug, Clone)]
pub struct MeanImputer {
    inner: Imputer,
}

impl MeanImputer {
    pub fn new(features: impl Into<FeatureNames>) -> Self {
        Self {
            inner: single_strategy_imputer(features.into(), ImputeStrategy::Mean),
        }
    }

    pub fn impute_values(&self) -> &HashMap<String, ScalarValue> {
        &self.inner.impute_values
    }

    pub async fn fit(&mut self, df: &DataFrame) -> FeFusionResult<()> {
        self.inner.fit(df).await
    }

    pub fn transform(&self, df: DataFrame) -> FeFusionResult<DataFrame> {
        self.inner.transform(df)
    }

    pub async fn fit_transform(&mut self, df: DataFrame) -> FeFusionResult<DataFrame> {
        self.inner.fit_transform(df).await
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

crate::impl_transformer!(MeanImputer);

/// Replaces missing values in the given columns with their most frequent value.
#[derive(Debug, Clone)]
pub struct MostFrequentImputer {
    inner: Imputer,
}

impl MostFrequentImputer {
    pub fn new(features: impl Into<FeatureNames>) -> Self {
        Self {
            inner: single_strategy_imputer(features.into(), ImputeStrategy::Mode),
        }
    }

    pub fn impute_values(&self) -> &HashMap<String, ScalarValue> {
        &self.inner.impute_values
    }

    pub async fn fit(&mut self, df: &DataFrame) -> FeFusionResult<()> {
        self.inner.fit(df).await
    }

    pub fn transform(&self, df: DataFrame) -> FeFusionResult<DataFrame> {
        self.inner.transform(df)
    }

    pub async fn fit_transform(&mut self, df: DataFrame) -> FeFusionResult<DataFrame> {
        self.inner.fit_transform(df).await
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

crate::impl_transformer!(MostFrequentImputer);

fn single_strategy_imputer(features: FeatureNames, strategy: ImputeStrategy) -> Imputer {
    Imputer::with_plan(ImputePlan::Explicit(
        features
            .into_vec()
            .into_iter()
            .map(|feature| (feature, strategy))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_parsing() {
        assert_eq!("median".parse::<StrategyKind>().unwrap(), StrategyKind::Median);
        assert_eq!(
            "fixed_value".parse::<StrategyKind>().unwrap(),
            StrategyKind::FixedValue
        );
        let err = "bad-strategy".parse::<StrategyKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter: strategy must be one of ['mean', 'median', 'mode', 'max', 'min', 'fixed_value']"
        );
    }

    #[test]
    fn test_default_config_auto_discovers_with_mean() {
        let plan = ImputerConfig::new().validate().unwrap();
        assert_eq!(plan, ImputePlan::AutoDiscover(ImputeStrategy::Mean));
    }

    #[test]
    fn test_strategy_without_features_auto_discovers() {
        let plan = ImputerConfig::new()
            .with_strategy(StrategyKind::Mode)
            .validate()
            .unwrap();
        assert_eq!(plan, ImputePlan::AutoDiscover(ImputeStrategy::Mode));
    }

    #[test]
    fn test_features_without_strategy_default_to_mean() {
        let plan = ImputerConfig::new().with_features("Rain").validate().unwrap();
        assert_eq!(
            plan,
            ImputePlan::Explicit(vec![("Rain".to_string(), ImputeStrategy::Mean)])
        );
    }

    #[test]
    fn test_fixed_value_implies_fixed_value_strategy() {
        let plan = ImputerConfig::new()
            .with_features(["Rain", "Temperature"])
            .with_fixed_value(-1.0)
            .validate()
            .unwrap();
        assert_eq!(
            plan,
            ImputePlan::Explicit(vec![
                ("Rain".to_string(), ImputeStrategy::FixedValue(-1.0)),
                ("Temperature".to_string(), ImputeStrategy::FixedValue(-1.0)),
            ])
        );
    }

    #[test]
    fn test_fixed_value_strategy_requires_value() {
        let err = ImputerConfig::new()
            .with_strategy(StrategyKind::FixedValue)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FeFusionError::InvalidParameter(_)));
    }

    #[test]
    fn test_fixed_value_with_other_strategy_is_rejected() {
        let err = ImputerConfig::new()
            .with_strategy(StrategyKind::Max)
            .with_fixed_value(3.0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("not 'max'"));
    }

    #[test]
    fn test_non_finite_fixed_value_is_rejected() {
        let err = ImputerConfig::new()
            .with_fixed_value(f64::INFINITY)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("must be finite"));
    }

    #[test]
    fn test_strategy_dict_is_exclusive() {
        let dict = [("Rain", ImputeStrategy::Max)];
        for config in [
            ImputerConfig::new()
                .with_strategy_dict(dict)
                .with_features("Rain"),
            ImputerConfig::new()
                .with_strategy_dict(dict)
                .with_strategy(StrategyKind::Max),
            ImputerConfig::new()
                .with_strategy_dict(dict)
                .with_fixed_value(0.0),
        ] {
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("Cannot use 'strategy_dict'"));
        }
    }

    #[test]
    fn test_json_config_parsing() {
        let config = ImputerConfig::from_json(
            r#"{"strategy_dict": {"Rain": "max", "Temperature": {"fixed_value": 0.5}}}"#,
        )
        .unwrap();
        assert_eq!(
            config.validate().unwrap(),
            ImputePlan::Explicit(vec![
                ("Rain".to_string(), ImputeStrategy::Max),
                ("Temperature".to_string(), ImputeStrategy::FixedValue(0.5)),
            ])
        );
    }

    #[test]
    fn test_json_config_rejects_unknown_key() {
        let err = ImputerConfig::from_json(r#"{"wrong_argument": ["Rain"]}"#).unwrap_err();
        assert!(matches!(err, FeFusionError::ConfigError(_)));
        assert!(err.to_string().contains("wrong_argument"));
    }

    #[test]
    fn test_json_config_rejects_unknown_strategy() {
        let err = ImputerConfig::from_json(r#"{"strategy": "bad-strategy"}"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad-strategy"));
        assert!(msg.contains("median"));
    }

    #[test]
    fn test_mode_dtype_rules() {
        for dtype in [
            DataType::Int32,
            DataType::UInt8,
            DataType::Utf8,
            DataType::Date32,
            DataType::Binary,
        ] {
            assert!(check_strategy_dtype("t", StrategyKind::Mode, &dtype).is_ok());
        }
        for dtype in [
            DataType::Float32,
            DataType::Float64,
            DataType::Decimal128(10, 2),
            DataType::Boolean,
        ] {
            let err = check_strategy_dtype("t", StrategyKind::Mode, &dtype).unwrap_err();
            assert!(matches!(err, FeFusionError::UnsupportedType(_)));
        }
    }

    #[test]
    fn test_numeric_strategies_reject_strings() {
        let err = check_strategy_dtype("City", StrategyKind::Mean, &DataType::Utf8).unwrap_err();
        assert!(err.to_string().contains("City is not a numerical feature"));
    }
}
