//! Bootstrap-aggregated ensemble of regression trees.

use super::node::Node;
use super::rng::{derive_seed, rng_for};
use super::trainer::{DecisionTreeRegressor, TreeConfig};
use crate::error::{Error, Result};
use log::debug;
use rand::Rng;
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    n_trees: usize,
    sample_ratio: f64,
    tree_config: TreeConfig,
    master_seed: u64,
}

impl EnsembleConfig {
    pub fn new(n_trees: usize, tree_config: TreeConfig) -> Result<Self> {
        if n_trees == 0 {
            return Err(Error::InvalidParameter("n_trees must be at least 1".into()));
        }
        Ok(EnsembleConfig {
            n_trees,
            sample_ratio: 1.0,
            tree_config,
            master_seed: 0,
        })
    }

    pub fn with_sample_ratio(mut self, sample_ratio: f64) -> Result<Self> {
        if !(sample_ratio > 0.0 && sample_ratio <= 1.0) {
            return Err(Error::InvalidParameter(
                "sample_ratio must be in (0, 1]".into(),
            ));
        }
        self.sample_ratio = sample_ratio;
        Ok(self)
    }

    pub fn with_master_seed(mut self, master_seed: u64) -> Self {
        self.master_seed = master_seed;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BaggingRegressor {
    config: EnsembleConfig,
    trees: Vec<DecisionTreeRegressor>,
    oob_masks: Vec<Vec<bool>>,
    n_features: usize,
    n_train: usize,
}

impl BaggingRegressor {
    pub fn new(config: EnsembleConfig) -> Self {
        BaggingRegressor {
            config,
            trees: Vec::new(),
            oob_masks: Vec::new(),
            n_features: 0,
            n_train: 0,
        }
    }

    pub fn train(&mut self, x: &[f64], row_length: usize, y: &[f64]) -> Result<()> {
        if row_length == 0 || y.is_empty() {
            return Err(Error::InvalidState(
                "cannot train an ensemble on an empty training set".into(),
            ));
        }
        if x.len() != y.len() * row_length {
            return Err(Error::InvalidDimensions {
                expected: vec![y.len() * row_length],
                got: vec![x.len()],
            });
        }

        let n = y.len();
        let sample_size = ((n as f64) * self.config.sample_ratio).floor().max(1.0) as usize;
        let master_seed = self.config.master_seed;
        let tree_config = self.config.tree_config.clone();

        let results: Vec<(DecisionTreeRegressor, Vec<bool>)> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = rng_for(master_seed, t as u64);
                let mut in_bag = vec![false; n];
                let mut sample_indices = Vec::with_capacity(sample_size);
                for _ in 0..sample_size {
                    let idx = rng.gen_range(0..n);
                    in_bag[idx] = true;
                    sample_indices.push(idx);
                }
                let oob_mask: Vec<bool> = in_bag.iter().map(|b| !b).collect();

                let mut bx = Vec::with_capacity(sample_size * row_length);
                let mut by = Vec::with_capacity(sample_size);
                for &i in &sample_indices {
                    bx.extend_from_slice(&x[i * row_length..(i + 1) * row_length]);
                    by.push(y[i]);
                }

                let mut tree =
                    DecisionTreeRegressor::new(tree_config.clone().with_seed(derive_seed(master_seed, t as u64)));
                tree.fit(&bx, row_length, &by)?;
                Ok((tree, oob_mask))
            })
            .collect::<Result<Vec<_>>>()?;

        let mean_oob: f64 = results
            .iter()
            .map(|(_, mask)| mask.iter().filter(|&&b| b).count())
            .sum::<usize>() as f64
            / results.len() as f64;
        debug!(
            "ensemble trained: n_trees={} mean_oob_samples={:.1}",
            results.len(),
            mean_oob
        );

        let (trees, oob_masks): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        self.trees = trees;
        self.oob_masks = oob_masks;
        self.n_features = row_length;
        self.n_train = n;
        Ok(())
    }

    pub fn predict_one(&self, sample: &[f64], row_length: usize) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(Error::InvalidState("ensemble has not been trained".into()));
        }
        if row_length != self.n_features || sample.len() != row_length {
            return Err(Error::InvalidDimensions {
                expected: vec![self.n_features],
                got: vec![sample.len()],
            });
        }
        let sum: f64 = self
            .trees
            .iter()
            .map(|t| t.predict_one(sample))
            .collect::<Result<Vec<f64>>>()?
            .into_iter()
            .sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn predict(&self, x: &[f64], row_length: usize) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(Error::InvalidState("ensemble has not been trained".into()));
        }
        if row_length != self.n_features || x.len() % row_length != 0 {
            return Err(Error::InvalidDimensions {
                expected: vec![self.n_features],
                got: vec![row_length],
            });
        }
        let n_rows = x.len() / row_length;
        (0..n_rows)
            .map(|r| self.predict_one(&x[r * row_length..(r + 1) * row_length], row_length))
            .collect()
    }

    pub fn evaluate(&self, x: &[f64], row_length: usize, y: &[f64]) -> Result<(f64, f64)> {
        let preds = self.predict(x, row_length)?;
        if preds.len() != y.len() {
            return Err(Error::InvalidDimensions {
                expected: vec![preds.len()],
                got: vec![y.len()],
            });
        }
        let n = preds.len() as f64;
        let mse = preds
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / n;
        let mae = preds
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / n;
        Ok((mse, mae))
    }

    /// Internal-node split counts across every tree, normalized to sum to 1.
    /// All zero if no tree ever split (e.g. every tree collapsed to a leaf).
    pub fn feature_importance(&self, n_features: usize) -> Vec<f64> {
        let mut counts = vec![0u64; n_features];
        for tree in &self.trees {
            if let Some(root) = tree.root() {
                root.accumulate_feature_splits(&mut counts);
            }
        }
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return vec![0.0; n_features];
        }
        counts.iter().map(|&c| c as f64 / total as f64).collect()
    }

    /// Mean-squared error over out-of-bag predictions on the training rows
    /// passed to [`BaggingRegressor::train`] (same `x`/`y` must be supplied).
    pub fn oob_error(&self, x: &[f64], row_length: usize, y: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(Error::InvalidState("ensemble has not been trained".into()));
        }
        if row_length != self.n_features || y.len() != self.n_train || x.len() != y.len() * row_length
        {
            return Err(Error::InvalidDimensions {
                expected: vec![self.n_train * self.n_features],
                got: vec![x.len()],
            });
        }

        let mut sum_sq = 0.0;
        let mut count = 0usize;
        for i in 0..self.n_train {
            let row = &x[i * row_length..(i + 1) * row_length];
            let mut preds = Vec::new();
            for (tree, mask) in self.trees.iter().zip(self.oob_masks.iter()) {
                if mask[i] {
                    preds.push(tree.predict_one(row)?);
                }
            }
            if preds.is_empty() {
                continue;
            }
            let mean_pred: f64 = preds.iter().sum::<f64>() / preds.len() as f64;
            sum_sq += (mean_pred - y[i]).powi(2);
            count += 1;
        }

        if count == 0 {
            return Err(Error::NumericalError(
                "no out-of-bag predictions available (raise n_trees or lower sample_ratio)".into(),
            ));
        }
        Ok(sum_sq / count as f64)
    }

    pub fn trees(&self) -> &[DecisionTreeRegressor] {
        &self.trees
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.trees.iter().filter_map(|t| t.root())
    }
}
