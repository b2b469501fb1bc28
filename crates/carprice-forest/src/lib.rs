//! Regression tree ensembles: arena trees, forests, and interval estimates.
//!
//! Provides a read-only Random Forest regressor whose member trees are
//! supplied pre-trained, the [`Estimator`]/[`Ensemble`] seams used to reach
//! individual members, and an [`IntervalEstimator`] that turns the spread of
//! member predictions into a normal-approximation confidence interval.

mod error;
mod estimator;
mod forest;
mod interval;
mod node;
mod tree;

pub use error::ForestError;
pub use estimator::{Ensemble, Estimator};
pub use forest::RandomForestRegressor;
pub use interval::{EnsembleEstimate, IntervalEstimator, Z_95};
pub use node::{FeatureIndex, Node, NodeIndex};
pub use tree::RegressionTree;
