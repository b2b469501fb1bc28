//! Seams between an ensemble and its independently-predicting members.

use crate::error::ForestError;

/// A fitted model that maps one feature row to one scalar prediction.
pub trait Estimator {
    /// Number of features a prediction input must have.
    fn n_features(&self) -> usize;

    /// Predict the target value for a single sample.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the sample cannot be scored,
    /// typically [`ForestError::PredictionFeatureMismatch`].
    fn predict(&self, sample: &[f64]) -> Result<f64, ForestError>;
}

/// A fitted ensemble exposing its member estimators.
pub trait Ensemble {
    /// Concrete member type.
    type Member: Estimator;

    /// Return every member estimator, in a stable order.
    fn estimators(&self) -> &[Self::Member];
}

impl<E: Estimator> Ensemble for Vec<E> {
    type Member = E;

    fn estimators(&self) -> &[E] {
        self
    }
}
