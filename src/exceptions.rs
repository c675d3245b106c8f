//! ## Custom Errors for fe-fusion
//!
//! This module defines the error type shared by every transformer in the crate.
//! It uses the `thiserror` crate to derive the `Error` trait.
//! Configuration problems surface as [`FeFusionError::InvalidParameter`] at construction time,
//! type problems as [`FeFusionError::UnsupportedType`] at fit time, and failures of the
//! underlying engine are wrapped as they are.
//!
//! The `FeFusionResult` type alias simplifies error handling by providing a convenient
//! alias for results returned by the library.
//!
//! ### Example
//!
//! ```rust
//! use fe_fusion::exceptions::{FeFusionError, FeFusionResult};
//!
//! fn check_smoothing(smoothing: f64) -> FeFusionResult<()> {
//!     if smoothing < 0.0 {
//!         return Err(FeFusionError::InvalidParameter(
//!             "smoothing must be non-negative".into(),
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Errors specific to the fe-fusion library.
#[derive(Debug, Error)]
pub enum FeFusionError {
    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// A JSON configuration document could not be parsed (unknown key, unknown strategy, bad value type).
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] serde_json::Error),

    /// Indicates that an invalid parameter was provided (e.g., unsupported value or conflicting options).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A column has a data type the requested operation cannot handle.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column holds no non-null value to derive a statistic from.
    #[error("Empty column: {0}")]
    EmptyColumn(String),

    /// Indicates the transform method was called before calling fit for a stateful transformer.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,
}

/// A convenient result type for fe-fusion operations.
pub type FeFusionResult<T> = std::result::Result<T, FeFusionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datafusion_error() {
        let df_err = datafusion::error::DataFusionError::Plan("test plan error".into());
        let err: FeFusionError = df_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("DataFusion error:"));
        assert!(err_msg.contains("test plan error"));
    }

    #[test]
    fn test_arrow_error() {
        let arrow_err = arrow::error::ArrowError::ComputeError("test compute error".into());
        let err: FeFusionError = arrow_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Arrow error:"));
        assert!(err_msg.contains("test compute error"));
    }

    #[test]
    fn test_config_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: FeFusionError = json_err.into();
        assert!(format!("{}", err).starts_with("Invalid configuration:"));
    }

    #[test]
    fn test_invalid_parameter_error() {
        let err = FeFusionError::InvalidParameter("bad param".into());
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Invalid parameter:"));
        assert!(err_msg.contains("bad param"));
    }

    #[test]
    fn test_unsupported_type_error() {
        let err = FeFusionError::UnsupportedType("dtype `Float64` is not supported".into());
        assert!(format!("{}", err).contains("Unsupported type: dtype `Float64`"));
    }

    #[test]
    fn test_missing_column_error() {
        let err = FeFusionError::MissingColumn("missing column".into());
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Missing column:"));
        assert!(err_msg.contains("missing column"));
    }

    #[test]
    fn test_empty_column_error() {
        let err = FeFusionError::EmptyColumn("Rain".into());
        assert_eq!(format!("{}", err), "Empty column: Rain");
    }

    #[test]
    fn test_fit_not_called_error() {
        let err = FeFusionError::FitNotCalled;
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Transform called before fit for stateful transformer"));
    }
}
