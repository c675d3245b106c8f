//! ## Transformer Trait
//!
//! The common fit/transform contract shared by every encoder and imputer in the crate.
//!
//! - `fit` learns parameters from a training table (and a target, for supervised transformers).
//! - `transform` applies the learned parameters to a table with the same schema and returns
//!   a new DataFrame together with any [`Diagnostic`]s raised on the way.
//! - `fit_transform` fits on a table and transforms that same table.
//!
//! Fitted state is read-only during `transform`, so a fitted transformer can be shared
//! between concurrent readers. The trait is object safe and can be used as
//! `Box<dyn Transformer>`.

use crate::diagnostics::{Diagnostic, Transformed};
use crate::exceptions::FeFusionResult;
use crate::target::Target;
use async_trait::async_trait;
use datafusion::prelude::DataFrame;

#[async_trait]
pub trait Transformer: Send + Sync {
    /// Learns parameters from `x` (and `y` when the transformer is supervised).
    async fn fit(&mut self, x: &DataFrame, y: Option<&Target>)
        -> FeFusionResult<Vec<Diagnostic>>;

    /// Applies the learned parameters to `x`.
    async fn transform(&self, x: DataFrame) -> FeFusionResult<Transformed>;

    /// Fits on `x` and transforms it. Diagnostics from both steps are returned in order.
    async fn fit_transform(
        &mut self,
        x: DataFrame,
        y: Option<&Target>,
    ) -> FeFusionResult<Transformed> {
        let mut diagnostics = self.fit(&x, y).await?;
        let transformed = self.transform(x).await?;
        diagnostics.extend(transformed.diagnostics);
        Ok(Transformed::new(transformed.frame, diagnostics))
    }

    /// Returns true if the transformer learns state during `fit`.
    fn is_stateful(&self) -> bool;
}

/// Implements [`Transformer`] for an unsupervised type whose inherent API is
/// `async fn fit(&mut self, &DataFrame) -> FeFusionResult<()>`,
/// `fn transform(&self, DataFrame) -> FeFusionResult<DataFrame>` and
/// `fn inherent_is_stateful(&self) -> bool`. The target, if given, is ignored.
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::transformer::Transformer for $ty {
            async fn fit(
                &mut self,
                x: &datafusion::prelude::DataFrame,
                _y: Option<&$crate::target::Target>,
            ) -> $crate::exceptions::FeFusionResult<Vec<$crate::diagnostics::Diagnostic>> {
                <$ty>::fit(self, x).await?;
                Ok(Vec::new())
            }
            async fn transform(
                &self,
                x: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::FeFusionResult<$crate::diagnostics::Transformed> {
                <$ty>::transform(self, x).map($crate::diagnostics::Transformed::clean)
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
        }
    };
}
