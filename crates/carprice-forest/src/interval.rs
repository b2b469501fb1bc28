//! Confidence intervals from the spread of ensemble member predictions.
//!
//! The interval is a normal approximation around the ensemble mean:
//! `mean ± z · σ / √N`, where `σ` is the population standard deviation of
//! the `N` member predictions. It bounds the mean prediction, not a new
//! observation, and member trees are not independent draws, so the nominal
//! coverage is a modelling convention rather than a guarantee.

use tracing::{debug, instrument};

use crate::error::ForestError;
use crate::estimator::{Ensemble, Estimator};

/// Two-sided 95% standard normal quantile.
pub const Z_95: f64 = 1.96;

/// Point estimate and symmetric confidence bounds from one ensemble prediction.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnsembleEstimate {
    /// Arithmetic mean of the member predictions.
    pub point: f64,
    /// `point - z * std_error`.
    pub lower: f64,
    /// `point + z * std_error`.
    pub upper: f64,
    /// Population standard deviation of the members divided by `√N`.
    pub std_error: f64,
    /// Number of member predictions aggregated.
    pub n_estimators: usize,
}

impl EnsembleEstimate {
    /// Return the distance from the point estimate to either bound.
    #[must_use]
    pub fn half_width(&self) -> f64 {
        self.upper - self.point
    }
}

/// Aggregates member predictions of an [`Ensemble`] into an [`EnsembleEstimate`].
///
/// Construct via [`IntervalEstimator::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `z_score` | [`Z_95`] (1.96) |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalEstimator {
    z_score: f64,
}

impl Default for IntervalEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalEstimator {
    /// Create an estimator producing 95% intervals.
    #[must_use]
    pub fn new() -> Self {
        Self { z_score: Z_95 }
    }

    /// Set the standard normal quantile used for the bounds.
    #[must_use]
    pub fn with_z_score(mut self, z_score: f64) -> Self {
        self.z_score = z_score;
        self
    }

    /// Return the z-score.
    #[must_use]
    pub fn z_score(&self) -> f64 {
        self.z_score
    }

    /// Collect one prediction per member estimator, in member order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyEnsemble`] | the ensemble has no members |
    /// | [`ForestError::EstimatorFailed`] | a member returned an error |
    /// | [`ForestError::NonFinitePrediction`] | a member returned NaN or an infinite value |
    pub fn member_predictions<E: Ensemble>(
        &self,
        ensemble: &E,
        sample: &[f64],
    ) -> Result<Vec<f64>, ForestError> {
        let members = ensemble.estimators();
        if members.is_empty() {
            return Err(ForestError::EmptyEnsemble);
        }
        members
            .iter()
            .enumerate()
            .map(|(index, member)| {
                let value = member.predict(sample).map_err(|e| ForestError::EstimatorFailed {
                    index,
                    source: Box::new(e),
                })?;
                if !value.is_finite() {
                    return Err(ForestError::NonFinitePrediction { index, value });
                }
                Ok(value)
            })
            .collect()
    }

    /// Predict `sample` with every member and summarize the spread.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidZScore`] | `z_score` is not positive and finite |
    /// | [`ForestError::EmptyEnsemble`] | the ensemble has no members |
    /// | [`ForestError::EstimatorFailed`] | a member returned an error |
    /// | [`ForestError::NonFinitePrediction`] | a member returned NaN or an infinite value |
    #[instrument(skip_all, fields(n_features = sample.len(), z = self.z_score))]
    pub fn estimate<E: Ensemble>(
        &self,
        ensemble: &E,
        sample: &[f64],
    ) -> Result<EnsembleEstimate, ForestError> {
        self.validate()?;
        let predictions = self.member_predictions(ensemble, sample)?;
        let estimate = self.summarize(&predictions)?;
        debug!(
            n_estimators = estimate.n_estimators,
            point = estimate.point,
            std_error = estimate.std_error,
            "ensemble estimate computed"
        );
        Ok(estimate)
    }

    /// Summarize precomputed member predictions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidZScore`] | `z_score` is not positive and finite |
    /// | [`ForestError::EmptyEnsemble`] | `predictions` is empty |
    pub fn summarize(&self, predictions: &[f64]) -> Result<EnsembleEstimate, ForestError> {
        self.validate()?;
        if predictions.is_empty() {
            return Err(ForestError::EmptyEnsemble);
        }
        let n = predictions.len() as f64;
        let point = predictions.iter().sum::<f64>() / n;
        // Population variance (divide by N).
        let variance = predictions.iter().map(|p| (p - point).powi(2)).sum::<f64>() / n;
        let std_error = variance.sqrt() / n.sqrt();
        let half_width = self.z_score * std_error;
        Ok(EnsembleEstimate {
            point,
            lower: point - half_width,
            upper: point + half_width,
            std_error,
            n_estimators: predictions.len(),
        })
    }

    fn validate(&self) -> Result<(), ForestError> {
        if !self.z_score.is_finite() || self.z_score <= 0.0 {
            return Err(ForestError::InvalidZScore { z: self.z_score });
        }
        Ok(())
    }
}
