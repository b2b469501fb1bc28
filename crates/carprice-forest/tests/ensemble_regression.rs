//! Ensemble regression tests for carprice-forest.
//!
//! These tests verify interval aggregation over a deterministic synthetic
//! forest of full binary trees.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use carprice_forest::{IntervalEstimator, Node, RandomForestRegressor, RegressionTree};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic forest
// ---------------------------------------------------------------------------

/// Build a full binary tree of the given depth in breadth-first arena order.
///
/// Node `i` has children `2i + 1` and `2i + 2`; leaf values are drawn around
/// `base` so member predictions spread like a price ensemble.
fn full_tree(rng: &mut ChaCha8Rng, depth: u32, n_features: usize, base: f64) -> RegressionTree {
    let n_internal = (1usize << depth) - 1;
    let n_nodes = (1usize << (depth + 1)) - 1;
    let nodes = (0..n_nodes)
        .map(|i| {
            if i < n_internal {
                Node::split(
                    rng.gen_range(0..n_features),
                    rng.gen_range(0.0..10.0),
                    2 * i + 1,
                    2 * i + 2,
                )
            } else {
                Node::leaf(base + rng.gen_range(-2_000.0..2_000.0))
            }
        })
        .collect();
    RegressionTree::from_nodes(nodes, n_features).unwrap()
}

fn make_forest(n_trees: usize, n_features: usize, seed: u64) -> RandomForestRegressor {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let trees = (0..n_trees)
        .map(|_| full_tree(&mut rng, 4, n_features, 15_000.0))
        .collect();
    let names = (0..n_features).map(|f| format!("f{f}")).collect();
    RandomForestRegressor::new(trees, names).unwrap()
}

fn make_sample(n_features: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n_features).map(|_| rng.r#gen::<f64>() * 10.0).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn point_matches_forest_mean() {
    let forest = make_forest(100, 6, 42);
    let sample = make_sample(6, 7);
    let est = IntervalEstimator::new().estimate(&forest, &sample).unwrap();
    let mean = forest.predict(&sample).unwrap();
    assert!((est.point - mean).abs() < 1e-6, "point {} vs mean {mean}", est.point);
    assert_eq!(est.n_estimators, 100);
}

#[test]
fn interval_brackets_point() {
    let forest = make_forest(100, 6, 42);
    for seed in 0..20 {
        let sample = make_sample(6, seed);
        let est = IntervalEstimator::new().estimate(&forest, &sample).unwrap();
        assert!(est.lower <= est.point && est.point <= est.upper);
        let asym = (est.upper - est.point) - (est.point - est.lower);
        assert!(asym.abs() < 1e-6, "asymmetry {asym} for seed {seed}");
    }
}

#[test]
fn more_trees_shrink_std_error() {
    // Same leaf distribution, 4x the members: std_error roughly halves.
    let small = make_forest(25, 6, 42);
    let large = make_forest(400, 6, 42);
    let sample = make_sample(6, 3);
    let a = IntervalEstimator::new().estimate(&small, &sample).unwrap();
    let b = IntervalEstimator::new().estimate(&large, &sample).unwrap();
    assert!(b.std_error < a.std_error, "{} !< {}", b.std_error, a.std_error);
}

#[test]
fn wrong_sample_width_reports_member() {
    let forest = make_forest(10, 6, 42);
    let err = IntervalEstimator::new().estimate(&forest, &[1.0, 2.0]).unwrap_err();
    assert!(matches!(
        err,
        carprice_forest::ForestError::EstimatorFailed { index: 0, .. }
    ));
}
