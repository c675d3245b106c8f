//! # Transformer Implementations
//!
//! The submodules contain the transformer implementations:
//!
//! - [`categorical_encoding`]: target encoding and one-hot encoding.
//! - [`imputation`]: null imputation with configurable per-feature strategies.

pub mod categorical_encoding;
pub mod imputation;

use crate::exceptions::{FeFusionError, FeFusionResult};
use datafusion::logical_expr::{ident, not, Case as DFCase, Expr};
use datafusion::prelude::DataFrame;
use datafusion::scalar::ScalarValue;

/// Validates that every column in `target_cols` exists in the DataFrame.
/// Returns an error if any target column is missing.
pub(crate) fn validate_columns(df: &DataFrame, target_cols: &[String]) -> FeFusionResult<()> {
    let schema = df.schema();
    for col_name in target_cols {
        if schema.field_with_name(None, col_name).is_err() {
            return Err(FeFusionError::MissingColumn(format!(
                "Column '{}' not found in DataFrame",
                col_name
            )));
        }
    }
    Ok(())
}

/// Constructs an expression equivalent to SQL COALESCE(value, fallback).
/// This is implemented as a CASE expression: if `value` is not null then return it, otherwise return `fallback`.
pub(crate) fn coalesce_expr(value: Expr, fallback: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(not(value.clone().is_null())), Box::new(value))],
        else_expr: Some(Box::new(fallback)),
    })
}

/// Rewrites the columns of `df` named in `target_cols` using `rewrite`, keeping every other
/// column, and the column order, as is. A `None` from `rewrite` leaves the column untouched.
pub(crate) fn rewrite_columns<F>(
    df: DataFrame,
    target_cols: &[String],
    rewrite: F,
) -> FeFusionResult<DataFrame>
where
    F: Fn(&str) -> Option<Expr>,
{
    let exprs: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let name = field.name();
            if target_cols.contains(name) {
                if let Some(expr) = rewrite(name) {
                    return expr.alias(name);
                }
            }
            ident(name)
        })
        .collect();
    df.select(exprs).map_err(FeFusionError::from)
}

/// Runs a single-row query (typically a global aggregate) and returns its first value.
/// An empty result yields `ScalarValue::Null`.
pub(crate) async fn collect_scalar(df: DataFrame) -> FeFusionResult<ScalarValue> {
    let batches = df.collect().await.map_err(FeFusionError::from)?;
    match batches.iter().find(|batch| batch.num_rows() > 0) {
        Some(batch) => Ok(ScalarValue::try_from_array(batch.column(0), 0)?),
        None => Ok(ScalarValue::Null),
    }
}
