//! Training service
//!
//! Validates a training request, fits a model through the configured
//! [`Trainer`] and publishes the result as a new artifact. Rejected requests
//! come back as `ok: false` responses; only storage and engine faults are
//! returned as errors.

use std::sync::Arc;
use std::time::Instant;

use ndarray::Array2;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use common::error::{Error, Result};
use common::models::{TrainRequest, TrainResponse};
use common::params::Hyperparameters;
use common::utils::format_duration;
use boosting_engine::Trainer;
use model_manager::{ModelArtifact, ModelRegistry};

/// Turns training requests into stored artifacts
pub struct TrainingService<T: Trainer> {
    /// Artifact store
    registry: Arc<ModelRegistry>,

    /// Fitting capability
    trainer: Arc<T>,
}

impl<T: Trainer> TrainingService<T> {
    /// Creates a new training service
    pub fn new(registry: Arc<ModelRegistry>, trainer: Arc<T>) -> Self {
        Self { registry, trainer }
    }

    /// Trains and stores one model version
    pub fn train(&self, request: TrainRequest) -> Result<TrainResponse> {
        if let Err(message) = validate(&request) {
            debug!(model_key = %request.model_key, "Training rejected: {}", message);
            return Ok(TrainResponse::failure(message));
        }

        let params = match Hyperparameters::overlay(&request.params) {
            Ok(params) => params,
            Err(e) => {
                debug!(model_key = %request.model_key, "Training rejected: {}", e);
                return Ok(TrainResponse::failure(e.to_string()));
            }
        };
        let ignored = Hyperparameters::ignored_keys(&request.params);
        if !ignored.is_empty() {
            warn!(model_key = %request.model_key, "Ignoring unknown hyperparameters: {:?}", ignored);
        }

        let features = to_matrix(&request.x, request.feature_names.len())?;
        let labels: Vec<i32> = request.y.iter().map(|&y| y as i32).collect();
        let (rows, cols) = features.dim();

        let started = Instant::now();
        let model = self
            .trainer
            .fit(&features, &labels, &request.feature_names, &params, params.n_estimators)?;

        let artifact = ModelArtifact::new(
            model,
            request.feature_names,
            request.model_key,
            request.meta,
            params.to_map(),
        );
        let stored = self.registry.store(&artifact)?;

        info!(
            model_key = %artifact.model_key,
            schema_hash = %artifact.schema_hash,
            rows,
            features = cols,
            elapsed = %format_duration(started.elapsed()),
            "Stored {}",
            stored.file_name
        );

        let mut metrics = Map::new();
        metrics.insert("rows".to_string(), json!(rows));
        metrics.insert("features".to_string(), json!(cols));
        metrics.insert("schemaHash".to_string(), Value::String(artifact.schema_hash));

        Ok(TrainResponse::success(
            stored.path.display().to_string(),
            stored.file_name,
            metrics,
        ))
    }
}

/// First failed check, as the message returned to the caller
fn validate(request: &TrainRequest) -> std::result::Result<(), String> {
    if request.model_key.is_empty() {
        return Err("modelKey is empty".to_string());
    }
    if request.feature_names.is_empty() {
        return Err("featureNames is empty".to_string());
    }
    if request.x.is_empty() || request.y.is_empty() {
        return Err("X/y is empty".to_string());
    }
    if request.x.len() != request.y.len() {
        return Err("X and y size mismatch".to_string());
    }

    let width = request.feature_names.len();
    if let Some((i, row)) = request.x.iter().enumerate().find(|(_, row)| row.len() != width) {
        return Err(format!("X row {} has {} values, expected {}", i, row.len(), width));
    }
    if request.y.iter().any(|&y| y != 0 && y != 1) {
        return Err("y must contain only 0/1 labels".to_string());
    }
    // Values that overflow f32 are as unusable as NaN.
    if request.x.iter().flatten().any(|&v| !(v as f32).is_finite()) {
        return Err("X contains non-finite values".to_string());
    }
    Ok(())
}

fn to_matrix(x: &[Vec<f64>], width: usize) -> Result<Array2<f32>> {
    let flat: Vec<f32> = x.iter().flatten().map(|&v| v as f32).collect();
    Array2::from_shape_vec((x.len(), width), flat)
        .map_err(|e| Error::Internal(format!("feature matrix shape: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boosting_engine::GbdtTrainer;
    use tempfile::TempDir;

    fn service() -> (TempDir, TrainingService<GbdtTrainer>) {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(ModelRegistry::open(dir.path()).unwrap());
        (dir, TrainingService::new(registry, Arc::new(GbdtTrainer::new())))
    }

    fn churn_request() -> TrainRequest {
        TrainRequest {
            model_key: "churn".to_string(),
            feature_names: vec!["age".to_string(), "tenure".to_string()],
            x: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            y: vec![0, 1],
            params: Map::new(),
            meta: Map::new(),
        }
    }

    fn files(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_train_stores_artifact() {
        let (dir, service) = service();
        let response = service.train(churn_request()).unwrap();

        assert!(response.ok);
        assert_eq!(response.message, "trained");
        assert_eq!(response.metrics["rows"], 2);
        assert_eq!(response.metrics["features"], 2);
        assert_eq!(response.metrics["schemaHash"].as_str().unwrap().len(), 10);

        let version = response.model_version.unwrap();
        assert!(version.starts_with("churn__"));
        assert!(version.ends_with(".json"));
        assert_eq!(files(&dir), vec![version.clone()]);
        assert!(response.model_path.unwrap().ends_with(&version));
    }

    #[test]
    fn test_validation_order_and_messages() {
        let (dir, service) = service();
        let cases: [(fn(&mut TrainRequest), &str); 8] = [
            (|r: &mut TrainRequest| r.model_key.clear(), "modelKey is empty"),
            (|r: &mut TrainRequest| r.feature_names.clear(), "featureNames is empty"),
            (|r: &mut TrainRequest| r.x.clear(), "X/y is empty"),
            (|r: &mut TrainRequest| r.y.clear(), "X/y is empty"),
            (|r: &mut TrainRequest| r.y.push(1), "X and y size mismatch"),
            (|r: &mut TrainRequest| r.x[1].push(5.0), "X row 1 has 3 values, expected 2"),
            (|r: &mut TrainRequest| r.y[0] = 2, "y must contain only 0/1 labels"),
            (|r: &mut TrainRequest| r.x[0][0] = 1e300, "X contains non-finite values"),
        ];

        for (mutate, expected) in cases {
            let mut request = churn_request();
            mutate(&mut request);
            let response = service.train(request).unwrap();
            assert!(!response.ok);
            assert_eq!(response.message, expected);
            assert!(response.model_path.is_none());
        }

        // Empty key wins over every later problem.
        let mut request = churn_request();
        request.model_key.clear();
        request.y.push(1);
        assert_eq!(service.train(request).unwrap().message, "modelKey is empty");

        assert!(files(&dir).is_empty());
    }

    #[test]
    fn test_size_mismatch_writes_nothing() {
        let (dir, service) = service();
        service.train(churn_request()).unwrap();
        let before = files(&dir);

        let mut request = churn_request();
        request.x.push(vec![5.0, 6.0]);
        let response = service.train(request).unwrap();

        assert!(!response.ok);
        assert_eq!(files(&dir), before);
    }

    #[test]
    fn test_bad_hyperparameter_is_rejected() {
        let (dir, service) = service();
        let mut request = churn_request();
        request.params.insert("max_depth".into(), json!("deep"));

        let response = service.train(request).unwrap();
        assert!(!response.ok);
        assert!(response.message.starts_with("invalid hyperparameter 'max_depth'"));
        assert!(files(&dir).is_empty());
    }

    #[test]
    fn test_huge_round_count_is_rejected_before_fitting() {
        let (dir, service) = service();
        let mut request = churn_request();
        request.params.insert("n_estimators".into(), json!(1e15));

        let response = service.train(request).unwrap();
        assert!(!response.ok);
        assert!(response.message.starts_with("invalid hyperparameter 'n_estimators'"));
        assert!(files(&dir).is_empty());
    }

    #[test]
    fn test_effective_params_are_captured() {
        let (dir, service) = service();
        let mut request = churn_request();
        request.params.insert("n_estimators".into(), json!(12));
        request.params.insert("eta".into(), json!(0.3));
        request.params.insert("nthread".into(), json!(4));
        request.meta.insert("owner".into(), json!("growth"));

        let response = service.train(request).unwrap();
        let path = std::path::PathBuf::from(response.model_path.unwrap());
        let registry = ModelRegistry::open(dir.path()).unwrap();
        let artifact: ModelArtifact<boosting_engine::Booster> = registry.read(&path).unwrap();

        assert_eq!(artifact.params["n_estimators"], 12);
        assert_eq!(artifact.params["eta"], 0.3);
        assert_eq!(artifact.params["max_depth"], 5);
        assert!(artifact.params.get("nthread").is_none());
        assert_eq!(artifact.meta["owner"], "growth");
        assert_eq!(artifact.model.num_trees(), 12);
        assert_eq!(artifact.model_key, "churn");
    }
}
