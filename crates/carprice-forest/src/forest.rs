//! Random Forest regressor assembled from pre-trained trees.

use tracing::debug;

use crate::error::ForestError;
use crate::estimator::{Ensemble, Estimator};
use crate::tree::RegressionTree;

/// Unvalidated wire form of a [`RandomForestRegressor`].
#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct ForestRepr {
    trees: Vec<RegressionTree>,
    feature_names: Vec<String>,
}

/// A fitted Random Forest regression ensemble.
///
/// The forest never trains; it is assembled from trees fitted elsewhere.
/// All trees share one feature count, equal to `feature_names.len()`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ForestRepr", into = "ForestRepr")]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    feature_names: Vec<String>,
}

impl TryFrom<ForestRepr> for RandomForestRegressor {
    type Error = ForestError;

    fn try_from(repr: ForestRepr) -> Result<Self, Self::Error> {
        Self::new(repr.trees, repr.feature_names)
    }
}

impl From<RandomForestRegressor> for ForestRepr {
    fn from(forest: RandomForestRegressor) -> Self {
        Self {
            trees: forest.trees,
            feature_names: forest.feature_names,
        }
    }
}

impl RandomForestRegressor {
    /// Assemble a forest from fitted trees and the names of their feature columns.
    ///
    /// An empty `trees` vector is accepted so degenerate packages can still be
    /// loaded and inspected; predicting with such a forest fails with
    /// [`ForestError::EmptyEnsemble`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::TreeFeatureMismatch`] | trees disagree on `n_features` |
    /// | [`ForestError::FeatureNamesMismatch`] | `feature_names.len()` differs from the trees' `n_features` |
    pub fn new(trees: Vec<RegressionTree>, feature_names: Vec<String>) -> Result<Self, ForestError> {
        let n_features = feature_names.len();
        if let Some(first) = trees.first()
            && first.n_features() != n_features
        {
            return Err(ForestError::FeatureNamesMismatch {
                n_names: n_features,
                n_features: first.n_features(),
            });
        }
        for (tree, t) in trees.iter().enumerate() {
            if t.n_features() != n_features {
                return Err(ForestError::TreeFeatureMismatch {
                    tree,
                    expected: n_features,
                    got: t.n_features(),
                });
            }
        }
        debug!(n_trees = trees.len(), n_features, "forest assembled");
        Ok(Self {
            trees,
            feature_names,
        })
    }

    /// Predict the target value for a single sample as the mean of all trees.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyEnsemble`] | the forest has no trees |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features` |
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::EmptyEnsemble);
        }
        if sample.len() != self.n_features() {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features(),
                got: sample.len(),
            });
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict(sample)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the member trees.
    #[must_use]
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

impl Estimator for RandomForestRegressor {
    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        RandomForestRegressor::predict(self, sample)
    }
}

impl Ensemble for RandomForestRegressor {
    type Member = RegressionTree;

    fn estimators(&self) -> &[RegressionTree] {
        &self.trees
    }
}
