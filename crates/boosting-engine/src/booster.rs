//! Gradient-boosted tree ensemble with logistic loss
//!
//! Each round fits a tree to the first and second derivatives of the log
//! loss at the current margins (grad = p - y, hess = p(1 - p)), then adds
//! the tree's output scaled by `eta` to every row's margin. Rows and
//! columns are subsampled per tree from a generator seeded with `seed`.

use std::time::Instant;

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::error::{Error, Result};
use common::params::Hyperparameters;
use common::utils::format_duration;

use crate::capability::{Scorer, Trainer};
use crate::histogram::{BinnedMatrix, MAX_BINS};
use crate::metrics;
use crate::tree::{TreeGrower, TreeNode, TreeParams};

// Keeps the Newton step finite once probabilities saturate.
const MIN_HESSIAN: f64 = 1e-16;

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// A fitted ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booster {
    /// Feature names the ensemble was fitted on, in column order
    feature_names: Vec<String>,

    /// One tree per boosting round
    trees: Vec<TreeNode>,

    /// Shrinkage applied to every tree output
    eta: f64,

    /// Margin before any tree is applied
    base_margin: f64,
}

impl Booster {
    /// Number of boosting rounds
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Summed log-odds for one row
    pub fn margin(&self, row: &[f32]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + self.eta * tree.predict(row))
    }

    /// Positive-class probability for one row
    pub fn predict_proba(&self, row: &[f32]) -> f64 {
        sigmoid(self.margin(row))
    }

    /// Checks that every split refers to one of the model's feature columns
    ///
    /// A split past the last column would index out of bounds while scoring.
    pub fn validate(&self) -> Result<()> {
        let width = self.feature_names.len();
        for (round, tree) in self.trees.iter().enumerate() {
            match tree.max_feature() {
                Some(feature) if feature >= width => {
                    return Err(Error::ArtifactCorrupt(format!(
                        "tree {} splits on feature {} but the model has {} features",
                        round, feature, width
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

}

impl Scorer for Booster {
    fn score(&self, features: &[f32], feature_names: &[String]) -> Result<f64> {
        self.validate()?;
        if feature_names != self.feature_names.as_slice() {
            return Err(Error::Engine(format!(
                "feature names {:?} do not match the fitted model {:?}",
                feature_names, self.feature_names
            )));
        }
        if features.len() != self.feature_names.len() {
            return Err(Error::Engine(format!(
                "expected {} feature values, got {}",
                self.feature_names.len(),
                features.len()
            )));
        }
        if let Some(pos) = features.iter().position(|v| !v.is_finite()) {
            return Err(Error::Engine(format!(
                "feature '{}' is not a finite number",
                self.feature_names[pos]
            )));
        }

        Ok(self.predict_proba(features))
    }
}

/// Built-in [`Trainer`] producing [`Booster`] models
#[derive(Debug, Clone, Default)]
pub struct GbdtTrainer {
    /// Bin budget per feature for histogram split finding
    max_bins: Option<usize>,
}

impl GbdtTrainer {
    /// Creates a trainer with the default bin budget
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a trainer with a custom histogram bin budget
    pub fn with_max_bins(max_bins: usize) -> Self {
        Self {
            max_bins: Some(max_bins),
        }
    }

    fn check_inputs(features: &Array2<f32>, labels: &[i32], feature_names: &[String]) -> Result<()> {
        let (rows, cols) = features.dim();
        if rows == 0 || cols == 0 {
            return Err(Error::Engine("empty feature matrix".to_string()));
        }
        if rows != labels.len() {
            return Err(Error::Engine(format!("{} rows but {} labels", rows, labels.len())));
        }
        if cols != feature_names.len() {
            return Err(Error::Engine(format!(
                "{} columns but {} feature names",
                cols,
                feature_names.len()
            )));
        }
        if labels.iter().any(|&y| y != 0 && y != 1) {
            return Err(Error::Engine("labels must be 0 or 1".to_string()));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(Error::Engine("feature matrix contains non-finite values".to_string()));
        }
        Ok(())
    }
}

impl Trainer for GbdtTrainer {
    type Model = Booster;

    fn fit(
        &self,
        features: &Array2<f32>,
        labels: &[i32],
        feature_names: &[String],
        params: &Hyperparameters,
        boosting_rounds: usize,
    ) -> Result<Booster> {
        Self::check_inputs(features, labels, feature_names)?;

        let started = Instant::now();
        let (rows, cols) = features.dim();
        let tree_params = TreeParams::from(params);
        let targets: Vec<f64> = labels.iter().map(|&y| y as f64).collect();

        let binned = params
            .tree_method
            .is_binned()
            .then(|| BinnedMatrix::build(features, self.max_bins.unwrap_or(MAX_BINS)));

        let mut rng = StdRng::seed_from_u64(params.seed);
        let base_margin = 0.0;
        let mut margins = vec![base_margin; rows];
        let mut trees = Vec::new();
        let mut grad = vec![0.0; rows];
        let mut hess = vec![0.0; rows];

        for _ in 0..boosting_rounds {
            for i in 0..rows {
                let p = sigmoid(margins[i]);
                grad[i] = p - targets[i];
                hess[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
            }

            let sampled_rows = subsample(&mut rng, rows, params.subsample);
            let sampled_cols = subsample(&mut rng, cols, params.colsample_bytree);

            let tree = TreeGrower::new(
                features,
                binned.as_ref(),
                &grad,
                &hess,
                &sampled_cols,
                tree_params,
            )
            .grow(&sampled_rows);

            for (i, row) in features.rows().into_iter().enumerate() {
                margins[i] += params.eta * predict_row(&tree, row);
            }

            trees.push(tree);
        }

        let leaves: usize = trees.iter().map(TreeNode::leaf_count).sum();
        let deepest = trees.iter().map(TreeNode::depth).max().unwrap_or(0);

        let booster = Booster {
            feature_names: feature_names.to_vec(),
            trees,
            eta: params.eta,
            base_margin,
        };

        let probs: Vec<f64> = margins.iter().map(|&m| sigmoid(m)).collect();
        debug!(
            rows,
            cols,
            rounds = boosting_rounds,
            leaves,
            deepest,
            tree_method = %params.tree_method,
            eval_metric = %params.eval_metric,
            train_metric = ?metrics::evaluate(params.eval_metric, &probs, labels),
            elapsed = %format_duration(started.elapsed()),
            "Boosting finished"
        );

        Ok(booster)
    }
}

fn predict_row(tree: &TreeNode, row: ArrayView1<'_, f32>) -> f64 {
    match row.as_slice() {
        Some(values) => tree.predict(values),
        None => tree.predict(&row.to_vec()),
    }
}

// Sorted sample of ceil(n * ratio) indices, at least one.
fn subsample(rng: &mut StdRng, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64 * ratio).ceil() as usize).clamp(1, n);
    let mut picked = index::sample(rng, n, k).into_vec();
    picked.sort_unstable();
    picked
}
