//! ## Data-quality diagnostics
//!
//! Non-fatal findings produced while fitting or transforming. They are returned to the
//! caller alongside the result and also emitted as `tracing` warnings.

use arrow::datatypes::DataType;
use datafusion::prelude::DataFrame;
use std::fmt;

/// A non-fatal data-quality finding.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A target-encoded feature is numeric and mostly unique, which usually means it is not categorical.
    PossiblyNumerical { feature: String },
    /// A column's type differed from the type seen at fit time and was cast to the fitted type.
    DtypeCoerced {
        feature: String,
        enforced: DataType,
        original: DataType,
    },
    /// These features contained values without a learned encoding; the global mean was used.
    UnseenValues { features: Vec<String> },
}

impl Diagnostic {
    /// Logs the diagnostic as a warning.
    pub(crate) fn emit(&self) {
        tracing::warn!("{}", self);
    }
}

fn quoted_list(names: &[String]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
    format!("[{}]", quoted.join(", "))
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::PossiblyNumerical { feature } => {
                write!(f, "Feature ['{}'] is possibly numerical", feature)
            }
            Diagnostic::DtypeCoerced {
                feature,
                enforced,
                original,
            } => write!(
                f,
                "Feature ['{}'] was mapped with dtype {} not {}, {} was enforced",
                feature, enforced, original, enforced
            ),
            Diagnostic::UnseenValues { features } => write!(
                f,
                "{} have unseen values, defaults to global mean",
                quoted_list(features)
            ),
        }
    }
}

/// The output of a `transform`: the new table plus whatever was noticed while producing it.
pub struct Transformed {
    pub frame: DataFrame,
    pub diagnostics: Vec<Diagnostic>,
}

impl Transformed {
    pub fn new(frame: DataFrame, diagnostics: Vec<Diagnostic>) -> Self {
        Self { frame, diagnostics }
    }

    /// Wraps a frame that was produced without any findings.
    pub fn clean(frame: DataFrame) -> Self {
        Self::new(frame, Vec::new())
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_possibly_numerical_message() {
        let d = Diagnostic::PossiblyNumerical {
            feature: "City".into(),
        };
        assert_eq!(d.to_string(), "Feature ['City'] is possibly numerical");
    }

    #[test]
    fn test_dtype_coerced_message() {
        let d = Diagnostic::DtypeCoerced {
            feature: "Rain".into(),
            enforced: DataType::Int64,
            original: DataType::Utf8,
        };
        assert_eq!(
            d.to_string(),
            "Feature ['Rain'] was mapped with dtype Int64 not Utf8, Int64 was enforced"
        );
    }

    #[test]
    fn test_unseen_values_message() {
        let d = Diagnostic::UnseenValues {
            features: vec!["City".into(), "Region".into()],
        };
        assert_eq!(
            d.to_string(),
            "['City', 'Region'] have unseen values, defaults to global mean"
        );
    }
}
