//! Single-tree growth: recursive splitting with in-place index partitioning.

use super::criterion::Criterion;
use super::node::Node;
use super::pruner::Pruner;
use super::rng::derive_seed;
use super::split_finder::SplitFinder;
use crate::error::{Error, Result};
use log::{debug, trace};

/// Depth/size gate for handing a node's two subtrees to `rayon::join` instead
/// of growing them serially — avoids task-spawn overhead dominating small
/// subtrees near the leaves.
const PARALLEL_MAX_DEPTH: usize = 3;
const PARALLEL_MIN_INDICES: usize = 2000;
const PARALLEL_MIN_CHILD: usize = 500;

#[derive(Debug, Clone)]
pub struct TreeConfig {
    criterion: Criterion,
    split_finder: SplitFinder,
    pruner: Pruner,
    max_depth: usize,
    min_samples_leaf: usize,
    seed: u64,
}

impl TreeConfig {
    /// `max_depth` defaults to `usize::MAX` (spec.md section 6: "effectively
    /// unbounded"); callers that want a hard cap must set one explicitly.
    pub fn new(criterion: Criterion, split_finder: SplitFinder, pruner: Pruner) -> Self {
        TreeConfig {
            criterion,
            split_finder,
            pruner,
            max_depth: usize::MAX,
            min_samples_leaf: 1,
            seed: 0,
        }
    }

    /// `max_depth = 0` is legal and collapses growth to a single leaf
    /// predicting the mean of `y` (spec.md section 8, invariant 4).
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Result<Self> {
        if min_samples_leaf == 0 {
            return Err(Error::InvalidParameter(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        self.min_samples_leaf = min_samples_leaf;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    config: TreeConfig,
    root: Option<Node>,
    n_features: usize,
}

impl DecisionTreeRegressor {
    pub fn new(config: TreeConfig) -> Self {
        DecisionTreeRegressor {
            config,
            root: None,
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &[f64], row_length: usize, y: &[f64]) -> Result<()> {
        if row_length == 0 || y.is_empty() {
            return Err(Error::InvalidState(
                "cannot fit a tree on an empty training set".into(),
            ));
        }
        if x.len() != y.len() * row_length {
            return Err(Error::InvalidDimensions {
                expected: vec![y.len() * row_length],
                got: vec![x.len()],
            });
        }

        let mut indices: Vec<usize> = (0..y.len()).collect();
        let mut root = grow(x, row_length, y, &mut indices, 0, 0, &self.config);
        self.config.pruner.prune(&mut root);
        debug!(
            "tree fit: depth={} nodes={} leaves={}",
            root.depth(),
            root.count_nodes(),
            root.count_leaves()
        );
        self.root = Some(root);
        self.n_features = row_length;
        Ok(())
    }

    pub fn predict_one(&self, sample: &[f64]) -> Result<f64> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| Error::InvalidState("tree has not been fitted".into()))?;
        if sample.len() != self.n_features {
            return Err(Error::InvalidDimensions {
                expected: vec![self.n_features],
                got: vec![sample.len()],
            });
        }
        Ok(root.predict(sample))
    }

    pub fn predict(&self, x: &[f64], row_length: usize) -> Result<Vec<f64>> {
        if self.root.is_none() {
            return Err(Error::InvalidState("tree has not been fitted".into()));
        }
        if row_length != self.n_features {
            return Err(Error::InvalidDimensions {
                expected: vec![self.n_features],
                got: vec![row_length],
            });
        }
        if x.len() % row_length != 0 {
            return Err(Error::InvalidDimensions {
                expected: vec![row_length],
                got: vec![x.len()],
            });
        }
        let n_rows = x.len() / row_length;
        (0..n_rows)
            .map(|r| self.predict_one(&x[r * row_length..(r + 1) * row_length]))
            .collect()
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Recursively grows a subtree over `indices`, partitioning the buffer
/// in place at each split rather than allocating fresh left/right copies up
/// front.
///
/// `node_path` identifies this node's position in the tree (root = 0, a
/// node's children are `2*path+1`/`2*path+2`) so the seed handed to a
/// `SplitFinder::Random` search is a pure function of tree position —
/// independent of how `rayon` happens to schedule the two-way recursion.
fn grow(
    x: &[f64],
    row_length: usize,
    y: &[f64],
    indices: &mut Vec<usize>,
    depth: usize,
    node_path: u64,
    config: &TreeConfig,
) -> Node {
    let n = indices.len();
    let parent_metric = config.criterion.node_metric(y, indices);
    let node_prediction = mean(y, indices);

    if depth >= config.max_depth || n < 2 * config.min_samples_leaf || n < 2 {
        trace!("leaf at depth {depth}: n={n} (stopping rule)");
        return Node::leaf(node_prediction, n, parent_metric);
    }

    let best = config.split_finder.find_best_split(
        x,
        row_length,
        y,
        indices,
        parent_metric,
        &config.criterion,
        derive_seed(config.seed, node_path),
    );

    let (feature, threshold, gain) = match best.feature {
        Some(f) if config.pruner.accepts_split(best.gain) => (f, best.threshold, best.gain),
        _ => {
            trace!("leaf at depth {depth}: n={n} (no accepted split)");
            return Node::leaf(node_prediction, n, parent_metric);
        }
    };

    let split_at = partition_in_place(x, row_length, indices, feature, threshold);
    if split_at < config.min_samples_leaf || n - split_at < config.min_samples_leaf {
        trace!("leaf at depth {depth}: n={n} (split would violate min_samples_leaf)");
        return Node::leaf(node_prediction, n, parent_metric);
    }

    let mut right = indices.split_off(split_at);
    let mut left = std::mem::take(indices);

    let left_len = left.len();
    let right_len = right.len();
    let use_parallel = depth <= PARALLEL_MAX_DEPTH
        && n > PARALLEL_MIN_INDICES
        && (left_len > PARALLEL_MIN_CHILD || right_len > PARALLEL_MIN_CHILD);

    let left_path = 2 * node_path + 1;
    let right_path = 2 * node_path + 2;
    let (left_node, right_node) = if use_parallel {
        rayon::join(
            || grow(x, row_length, y, &mut left, depth + 1, left_path, config),
            || grow(x, row_length, y, &mut right, depth + 1, right_path, config),
        )
    } else {
        let l = grow(x, row_length, y, &mut left, depth + 1, left_path, config);
        let r = grow(x, row_length, y, &mut right, depth + 1, right_path, config);
        (l, r)
    };

    trace!("split at depth {depth}: feature={feature} threshold={threshold} gain={gain}");
    Node::internal(
        feature,
        threshold,
        left_node,
        right_node,
        n,
        parent_metric,
        node_prediction,
    )
}

fn mean(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

/// Lomuto-style in-place partition: everything with `x[feature] <= threshold`
/// moves before the split point, returned as the left-subset length.
fn partition_in_place(
    x: &[f64],
    row_length: usize,
    indices: &mut [usize],
    feature: usize,
    threshold: f64,
) -> usize {
    let mut split = 0;
    for j in 0..indices.len() {
        if x[indices[j] * row_length + feature] <= threshold {
            indices.swap(split, j);
            split += 1;
        }
    }
    split
}
