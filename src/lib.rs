//! # fe-fusion
//!
//! Feature preprocessing transforms for tabular data held in Apache DataFusion
//! [`DataFrame`](datafusion::prelude::DataFrame)s:
//!
//! - [`TargetEncoder`](transformers::categorical_encoding::TargetEncoder): smoothed mean target encoding.
//! - [`OneHotEncoder`](transformers::categorical_encoding::OneHotEncoder): one indicator column per category.
//! - [`Imputer`](transformers::imputation::Imputer): null filling with mean, median, mode, min, max or a fixed value.
//! - [`MeanImputer`](transformers::imputation::MeanImputer) and
//!   [`MostFrequentImputer`](transformers::imputation::MostFrequentImputer): single-strategy imputers.
//!
//! Every transform follows the same contract: `fit` learns parameters from a training table
//! (and a target where one is needed), `transform` applies them to any table with the same
//! schema, and `fit_transform` does both. Data-quality warnings are returned as
//! [`Diagnostic`](diagnostics::Diagnostic)s next to the result and are also logged with `tracing`.

pub mod diagnostics;
pub mod exceptions;
pub mod features;
mod logging;
pub mod target;
pub mod transformer;
pub mod transformers;
