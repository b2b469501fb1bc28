//! Pre-trained regression trees stored as validated node arenas.

use crate::error::ForestError;
use crate::estimator::Estimator;
use crate::node::Node;

/// Unvalidated wire form of a [`RegressionTree`].
#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct TreeRepr {
    nodes: Vec<Node>,
    n_features: usize,
}

/// A fitted CART regression tree.
///
/// Stored as an arena-based `Vec<Node>` with index references. Every tree
/// that exists has passed [`RegressionTree::from_nodes`] validation, including
/// trees produced by deserialization, so traversal cannot index out of bounds
/// or loop.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "TreeRepr", into = "TreeRepr")]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl TryFrom<TreeRepr> for RegressionTree {
    type Error = ForestError;

    fn try_from(repr: TreeRepr) -> Result<Self, Self::Error> {
        Self::from_nodes(repr.nodes, repr.n_features)
    }
}

impl From<RegressionTree> for TreeRepr {
    fn from(tree: RegressionTree) -> Self {
        Self {
            nodes: tree.nodes,
            n_features: tree.n_features,
        }
    }
}

impl RegressionTree {
    /// Build a tree from an arena of nodes rooted at index 0.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyTree`] | `nodes` is empty |
    /// | [`ForestError::ChildOutOfRange`] | a child index is past the end of the arena |
    /// | [`ForestError::NonForwardChild`] | a child index is not greater than its parent's |
    /// | [`ForestError::SharedChild`] | a node is referenced by more than one split slot |
    /// | [`ForestError::FeatureOutOfRange`] | a split tests a feature `>= n_features` |
    /// | [`ForestError::NonFiniteThreshold`] | a split threshold is NaN or infinite |
    /// | [`ForestError::NonFiniteLeafValue`] | a leaf value is NaN or infinite |
    pub fn from_nodes(nodes: Vec<Node>, n_features: usize) -> Result<Self, ForestError> {
        if nodes.is_empty() {
            return Err(ForestError::EmptyTree);
        }
        let n_nodes = nodes.len();
        let mut has_parent = vec![false; n_nodes];
        for (node, n) in nodes.iter().enumerate() {
            match n {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature.index() >= n_features {
                        return Err(ForestError::FeatureOutOfRange {
                            node,
                            feature: feature.index(),
                            n_features,
                        });
                    }
                    if !threshold.is_finite() {
                        return Err(ForestError::NonFiniteThreshold { node });
                    }
                    for child in [left.index(), right.index()] {
                        if child >= n_nodes {
                            return Err(ForestError::ChildOutOfRange {
                                node,
                                child,
                                n_nodes,
                            });
                        }
                        if child <= node {
                            return Err(ForestError::NonForwardChild { node, child });
                        }
                        if std::mem::replace(&mut has_parent[child], true) {
                            return Err(ForestError::SharedChild { node, child });
                        }
                    }
                }
                Node::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(ForestError::NonFiniteLeafValue { node });
                    }
                }
            }
        }
        Ok(Self { nodes, n_features })
    }

    /// Build a single-leaf tree that always predicts `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::NonFiniteLeafValue`] when `value` is NaN or infinite.
    pub fn constant(value: f64, n_features: usize) -> Result<Self, ForestError> {
        Self::from_nodes(vec![Node::leaf(value)], n_features)
    }

    /// Predict the target value for a single sample.
    ///
    /// Traverses from the root (index 0): at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let leaf = self.traverse(sample);
        match &self.nodes[leaf] {
            Node::Leaf { value, .. } => Ok(*value),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the number of features this tree expects.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0. Children always
    /// follow their parent, so one forward pass over the arena suffices.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max_depth = 0usize;
        for (idx, node) in self.nodes.iter().enumerate() {
            let d = depths[idx];
            max_depth = max_depth.max(d);
            if let Node::Split { left, right, .. } = node {
                depths[left.index()] = d + 1;
                depths[right.index()] = d + 1;
            }
        }
        max_depth
    }

    /// Traverse the tree from the root and return the arena index of the leaf.
    fn traverse(&self, sample: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

impl Estimator for RegressionTree {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        RegressionTree::predict(self, sample)
    }
}
