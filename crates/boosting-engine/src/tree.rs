//! Regression trees grown on gradient/Hessian statistics
//!
//! - Leaf weight: w* = -T(G) / (H + lambda), T = L1 soft-threshold by alpha
//! - Split gain: 0.5 * [T(GL)²/(HL+λ) + T(GR)²/(HR+λ) - T(G)²/(H+λ)]
//! - Both children must carry a Hessian sum of at least `min_child_weight`

use std::cmp::Ordering;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use common::params::Hyperparameters;

use crate::histogram::BinnedMatrix;

/// Smallest gain that justifies a split
const MIN_SPLIT_GAIN: f64 = 1e-10;

/// A node of a fitted tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Terminal node
    Leaf {
        /// Raw output before shrinkage
        weight: f64,
    },

    /// Binary split on one feature column
    Split {
        /// Column index into the row
        feature: usize,

        /// Rows with a value at or below this go left
        threshold: f32,

        /// Subtree for `value <= threshold`
        left: Box<TreeNode>,

        /// Subtree for `value > threshold`
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    /// Raw (unshrunk) output for one row
    pub fn predict(&self, row: &[f32]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { weight } => return *weight,
                TreeNode::Split { feature, threshold, left, right } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Highest feature index any split reads; `None` for a lone leaf
    pub fn max_feature(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Split { feature, left, right, .. } => {
                let below = left.max_feature().max(right.max_feature());
                Some(below.map_or(*feature, |f| f.max(*feature)))
            }
        }
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Depth of the deepest leaf; a lone leaf has depth 0
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Regularisation knobs that shape a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Depth limit; 0 grows a single leaf
    pub max_depth: usize,

    /// Minimum Hessian sum in each child of a split
    pub min_child_weight: f64,

    /// L2 penalty on leaf weights
    pub reg_lambda: f64,

    /// L1 penalty on leaf weights
    pub reg_alpha: f64,
}

impl From<&Hyperparameters> for TreeParams {
    fn from(params: &Hyperparameters) -> Self {
        Self {
            max_depth: params.max_depth,
            min_child_weight: params.min_child_weight,
            reg_lambda: params.reg_lambda,
            reg_alpha: params.reg_alpha,
        }
    }
}

impl TreeParams {
    fn threshold_l1(&self, g: f64) -> f64 {
        if g > self.reg_alpha {
            g - self.reg_alpha
        } else if g < -self.reg_alpha {
            g + self.reg_alpha
        } else {
            0.0
        }
    }

    /// Optimal leaf weight for the given sums
    pub fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -self.threshold_l1(g) / denom
    }

    fn structure_score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        let t = self.threshold_l1(g);
        t * t / denom
    }

    fn split_gain(&self, gl: f64, hl: f64, gr: f64, hr: f64) -> f64 {
        0.5 * (self.structure_score(gl, hl) + self.structure_score(gr, hr)
            - self.structure_score(gl + gr, hl + hr))
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f32,
    gain: f64,
}

impl SplitCandidate {
    // Higher gain wins; equal gains prefer the lower feature index.
    fn rank(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| other.feature.cmp(&self.feature))
    }
}

/// Grows one tree
pub struct TreeGrower<'a> {
    x: &'a Array2<f32>,
    binned: Option<&'a BinnedMatrix>,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: TreeParams,
}

impl<'a> TreeGrower<'a> {
    /// Creates a grower; `binned` switches split finding to histograms
    pub fn new(
        x: &'a Array2<f32>,
        binned: Option<&'a BinnedMatrix>,
        grad: &'a [f64],
        hess: &'a [f64],
        features: &'a [usize],
        params: TreeParams,
    ) -> Self {
        Self {
            x,
            binned,
            grad,
            hess,
            features,
            params,
        }
    }

    /// Grows a tree over `rows`
    pub fn grow(&self, rows: &[usize]) -> TreeNode {
        self.grow_node(rows, 0)
    }

    fn grow_node(&self, rows: &[usize], depth: usize) -> TreeNode {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        let leaf = TreeNode::Leaf {
            weight: self.params.leaf_weight(g, h),
        };

        if depth >= self.params.max_depth || rows.len() < 2 || h < 2.0 * self.params.min_child_weight {
            return leaf;
        }

        let best = self
            .features
            .par_iter()
            .filter_map(|&f| match self.binned {
                Some(binned) => self.best_binned_split(binned, rows, f, g, h),
                None => self.best_exact_split(rows, f, g, h),
            })
            .max_by(|a, b| a.rank(b));

        let split = match best {
            Some(split) if split.gain > MIN_SPLIT_GAIN => split,
            _ => return leaf,
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);

        if left_rows.is_empty() || right_rows.is_empty() {
            return leaf;
        }

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow_node(&left_rows, depth + 1)),
            right: Box::new(self.grow_node(&right_rows, depth + 1)),
        }
    }

    fn best_exact_split(&self, rows: &[usize], feature: usize, g: f64, h: f64) -> Option<SplitCandidate> {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

        let mut gl = 0.0;
        let mut hl = 0.0;
        let mut best: Option<SplitCandidate> = None;

        for pair in sorted.windows(2) {
            let (cur, next) = (pair[0], pair[1]);
            gl += self.grad[cur];
            hl += self.hess[cur];

            let (v, v_next) = (self.x[[cur, feature]], self.x[[next, feature]]);
            if v == v_next {
                continue;
            }

            let (gr, hr) = (g - gl, h - hl);
            if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                continue;
            }

            let gain = self.params.split_gain(gl, hl, gr, hr);
            if best.map_or(true, |b| gain > b.gain) {
                let mid = ((v as f64 + v_next as f64) / 2.0) as f32;
                // Adjacent floats can round the midpoint up onto v_next.
                let threshold = if mid < v_next { mid } else { v };
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                });
            }
        }

        best
    }

    fn best_binned_split(
        &self,
        binned: &BinnedMatrix,
        rows: &[usize],
        feature: usize,
        g: f64,
        h: f64,
    ) -> Option<SplitCandidate> {
        let cuts = binned.cuts(feature);
        if cuts.len() < 2 {
            return None;
        }

        let mut grad_hist = vec![0.0f64; cuts.len()];
        let mut hess_hist = vec![0.0f64; cuts.len()];
        for &i in rows {
            let b = binned.bin(i, feature);
            grad_hist[b] += self.grad[i];
            hess_hist[b] += self.hess[i];
        }

        let mut gl = 0.0;
        let mut hl = 0.0;
        let mut best: Option<SplitCandidate> = None;

        for b in 0..cuts.len() - 1 {
            gl += grad_hist[b];
            hl += hess_hist[b];

            let (gr, hr) = (g - gl, h - hl);
            if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                continue;
            }

            let gain = self.params.split_gain(gl, hl, gr, hr);
            if best.map_or(true, |c| gain > c.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: cuts[b],
                    gain,
                });
            }
        }

        best
    }
}
