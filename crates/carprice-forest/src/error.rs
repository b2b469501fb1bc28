/// Errors from tree construction and ensemble prediction.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when a tree arena contains no nodes.
    #[error("tree has no nodes")]
    EmptyTree,

    /// Returned when a split references a child outside the arena.
    #[error("node {node} references child {child}, but the tree has {n_nodes} nodes")]
    ChildOutOfRange {
        /// Arena index of the offending split.
        node: usize,
        /// The out-of-range child index.
        child: usize,
        /// Number of nodes in the arena.
        n_nodes: usize,
    },

    /// Returned when a split references a child at or before itself.
    ///
    /// Children must sit strictly after their parent so traversal always
    /// terminates.
    #[error("node {node} references child {child}, which does not follow it in the arena")]
    NonForwardChild {
        /// Arena index of the offending split.
        node: usize,
        /// The backward or self-referencing child index.
        child: usize,
    },

    /// Returned when a node is the child of more than one split, or both
    /// children of the same split.
    ///
    /// Every node below the root has exactly one parent.
    #[error("node {node} references child {child}, which already has a parent")]
    SharedChild {
        /// Arena index of the second split referencing `child`.
        node: usize,
        /// The child index referenced twice.
        child: usize,
    },

    /// Returned when a split tests a feature the tree was not trained on.
    #[error("node {node} splits on feature {feature}, but the tree has {n_features} features")]
    FeatureOutOfRange {
        /// Arena index of the offending split.
        node: usize,
        /// The out-of-range feature index.
        feature: usize,
        /// Number of features the tree expects.
        n_features: usize,
    },

    /// Returned when a split threshold is NaN or infinite.
    #[error("node {node} has a non-finite threshold")]
    NonFiniteThreshold {
        /// Arena index of the offending split.
        node: usize,
    },

    /// Returned when a leaf value is NaN or infinite.
    #[error("leaf {node} has a non-finite value")]
    NonFiniteLeafValue {
        /// Arena index of the offending leaf.
        node: usize,
    },

    /// Returned when the trees of a forest disagree on their feature count.
    #[error("tree {tree} expects {got} features, expected {expected}")]
    TreeFeatureMismatch {
        /// Zero-based index of the offending tree.
        tree: usize,
        /// Feature count shared by the preceding trees.
        expected: usize,
        /// Feature count of the offending tree.
        got: usize,
    },

    /// Returned when the number of feature names differs from the trees' feature count.
    #[error("forest has {n_names} feature names, but its trees expect {n_features} features")]
    FeatureNamesMismatch {
        /// Number of feature names supplied.
        n_names: usize,
        /// Number of features the trees expect.
        n_features: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when an ensemble with zero member estimators is asked to predict.
    #[error("ensemble has no member estimators")]
    EmptyEnsemble,

    /// Returned when a member estimator fails during prediction.
    #[error("member estimator {index} failed")]
    EstimatorFailed {
        /// Zero-based index of the failing member.
        index: usize,
        /// The member's own error.
        source: Box<ForestError>,
    },

    /// Returned when a member estimator produces NaN or an infinite value.
    #[error("member estimator {index} produced non-finite prediction {value}")]
    NonFinitePrediction {
        /// Zero-based index of the offending member.
        index: usize,
        /// The non-finite prediction.
        value: f64,
    },

    /// Returned when the interval z-score is not a positive finite number.
    #[error("z-score must be positive and finite, got {z}")]
    InvalidZScore {
        /// The invalid z-score.
        z: f64,
    },
}
