//! Capability traits consumed by the registry

use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::Serialize;

use common::error::Result;
use common::params::Hyperparameters;

/// Produces a single score for one feature vector
pub trait Scorer {
    /// Scores one row whose values are aligned with `feature_names`
    fn score(&self, features: &[f32], feature_names: &[String]) -> Result<f64>;
}

/// Fits a model from a labeled feature matrix
///
/// The produced model is persisted inside an artifact bundle, so it must
/// round-trip through serde.
pub trait Trainer: Send + Sync {
    /// Trained model type
    type Model: Scorer + Serialize + DeserializeOwned + Send + Sync;

    /// Fits a model on `features` (rows x columns) and 0/1 `labels`
    fn fit(
        &self,
        features: &Array2<f32>,
        labels: &[i32],
        feature_names: &[String],
        params: &Hyperparameters,
        boosting_rounds: usize,
    ) -> Result<Self::Model>;
}
