//! Prediction service
//!
//! Every call re-resolves the newest artifact for the request's model key
//! and schema fingerprint; nothing is cached between calls, so a concurrent
//! training is picked up by the next prediction.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use common::error::Result;
use common::models::{PredictRequest, PredictResponse, MSG_MODEL_NOT_FOUND, MSG_SCHEMA_MISMATCH};
use boosting_engine::Scorer;
use model_manager::{fingerprint, ModelArtifact, ModelRegistry};

/// Scores single rows against the newest compatible artifact
pub struct PredictionService<M> {
    /// Artifact store
    registry: Arc<ModelRegistry>,

    _model: PhantomData<fn() -> M>,
}

impl<M: Scorer + DeserializeOwned> PredictionService<M> {
    /// Creates a new prediction service
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            _model: PhantomData,
        }
    }

    /// Scores one feature vector
    pub fn predict(&self, request: &PredictRequest) -> Result<PredictResponse> {
        if let Err(message) = validate(request) {
            debug!(model_key = %request.model_key, "Prediction rejected: {}", message);
            return Ok(PredictResponse::failure(message));
        }

        let schema_hash = fingerprint(&request.feature_names);

        let path = match self.registry.find_latest(&request.model_key, &schema_hash)? {
            Some(path) => path,
            None => return self.miss(request, &schema_hash),
        };

        let artifact: ModelArtifact<M> = self.registry.read(&path)?;
        if !artifact.matches_schema(&request.feature_names) {
            warn!(
                model_key = %request.model_key,
                schema_hash = %schema_hash,
                "Fingerprint matched but stored feature names differ in {:?}",
                path
            );
            return Ok(schema_mismatch(&artifact.feature_names, request, &schema_hash));
        }

        let row: Vec<f32> = request.x.iter().map(|&v| v as f32).collect();
        let score = artifact.model.score(&row, &request.feature_names)?;

        let model_version = file_name(&path);
        debug!(model_key = %request.model_key, score, "Scored with {}", model_version);

        Ok(PredictResponse::success(score, model_version, schema_debug(&schema_hash)))
    }

    // No artifact carries this fingerprint. A stored schema with the same
    // names in another order is reported as a mismatch, anything else as a
    // plain miss.
    fn miss(&self, request: &PredictRequest, schema_hash: &str) -> Result<PredictResponse> {
        for path in self.registry.latest_per_schema(&request.model_key)? {
            let stored = match self.registry.read::<M>(&path) {
                Ok(artifact) => artifact.feature_names,
                Err(e) => {
                    warn!("Skipping unreadable artifact {:?}: {}", path, e);
                    continue;
                }
            };
            if is_permutation(&stored, &request.feature_names) {
                debug!(model_key = %request.model_key, "Feature order drifted from {:?}", path);
                return Ok(schema_mismatch(&stored, request, schema_hash));
            }
        }

        debug!(model_key = %request.model_key, schema_hash, "No artifact found");
        Ok(PredictResponse::failure_with(MSG_MODEL_NOT_FOUND, schema_debug(schema_hash)))
    }
}

fn validate(request: &PredictRequest) -> std::result::Result<(), String> {
    if request.model_key.is_empty() {
        return Err("modelKey is empty".to_string());
    }
    if request.feature_names.is_empty() {
        return Err("featureNames is empty".to_string());
    }
    if request.x.len() != request.feature_names.len() {
        return Err("x size != featureNames size".to_string());
    }
    if request.x.iter().any(|&v| !(v as f32).is_finite()) {
        return Err("x contains non-finite values".to_string());
    }
    Ok(())
}

fn is_permutation(stored: &[String], requested: &[String]) -> bool {
    if stored.len() != requested.len() {
        return false;
    }
    let mut a: Vec<&String> = stored.iter().collect();
    let mut b: Vec<&String> = requested.iter().collect();
    a.sort();
    b.sort();
    a == b
}

fn schema_debug(schema_hash: &str) -> Map<String, Value> {
    let mut debug = Map::new();
    debug.insert("schemaHash".to_string(), json!(schema_hash));
    debug
}

fn schema_mismatch(expected: &[String], request: &PredictRequest, schema_hash: &str) -> PredictResponse {
    let mut debug = schema_debug(schema_hash);
    debug.insert("expected".to_string(), json!(expected));
    debug.insert("got".to_string(), json!(request.feature_names));
    PredictResponse::failure_with(MSG_SCHEMA_MISMATCH, debug)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use boosting_engine::Booster;
    use std::fs;
    use tempfile::TempDir;

    /// Returns the first feature value as the score
    #[derive(serde::Serialize, serde::Deserialize)]
    struct FirstValue;

    impl Scorer for FirstValue {
        fn score(&self, features: &[f32], _feature_names: &[String]) -> Result<f64> {
            Ok(features[0] as f64)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (TempDir, Arc<ModelRegistry>, PredictionService<FirstValue>) {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(ModelRegistry::open(dir.path()).unwrap());
        let service = PredictionService::new(registry.clone());
        (dir, registry, service)
    }

    fn request(key: &str, features: &[&str], x: Vec<f64>) -> PredictRequest {
        PredictRequest {
            model_key: key.to_string(),
            feature_names: names(features),
            x,
            meta: Map::new(),
        }
    }

    fn store(registry: &ModelRegistry, key: &str, features: &[&str]) -> String {
        let artifact = ModelArtifact::new(FirstValue, names(features), key, Map::new(), Map::new());
        registry.store(&artifact).unwrap().file_name
    }

    #[test]
    fn test_validation_messages() {
        let (_dir, _registry, service) = setup();
        let cases = [
            (request("", &["a"], vec![1.0]), "modelKey is empty"),
            (request("k", &[], vec![]), "featureNames is empty"),
            (request("k", &["a", "b"], vec![1.0]), "x size != featureNames size"),
            (request("k", &["a"], vec![f64::MAX]), "x contains non-finite values"),
        ];
        for (req, expected) in cases {
            let response = service.predict(&req).unwrap();
            assert!(!response.ok);
            assert_eq!(response.message, expected);
            assert_eq!(response.score, 0.0);
        }
    }

    #[test]
    fn test_cold_start_is_not_found() {
        let (_dir, _registry, service) = setup();
        let response = service.predict(&request("churn", &["age"], vec![1.0])).unwrap();

        assert!(!response.ok);
        assert_eq!(response.message, MSG_MODEL_NOT_FOUND);
        assert_eq!(response.score, 0.0);
        assert_eq!(response.debug["schemaHash"], fingerprint(&["age"]));
        assert!(response.model_version.is_none());
    }

    #[test]
    fn test_scores_with_latest_artifact() {
        let (_dir, registry, service) = setup();
        let version = store(&registry, "churn", &["age", "tenure"]);

        let response = service
            .predict(&request("churn", &["age", "tenure"], vec![0.75, 3.0]))
            .unwrap();
        assert!(response.ok);
        assert_eq!(response.message, "ok");
        assert_eq!(response.score, 0.75);
        assert_eq!(response.model_version, Some(version));
        assert_eq!(response.debug["schemaHash"], fingerprint(&["age", "tenure"]));
    }

    #[test]
    fn test_permuted_names_are_a_schema_mismatch() {
        let (_dir, registry, service) = setup();
        store(&registry, "churn", &["age", "tenure"]);

        let response = service
            .predict(&request("churn", &["tenure", "age"], vec![2.0, 1.0]))
            .unwrap();
        assert!(!response.ok);
        assert_eq!(response.message, MSG_SCHEMA_MISMATCH);
        assert_eq!(response.debug["expected"], json!(["age", "tenure"]));
        assert_eq!(response.debug["got"], json!(["tenure", "age"]));
        assert_eq!(response.debug["schemaHash"], fingerprint(&["tenure", "age"]));
    }

    #[test]
    fn test_other_schema_is_not_found() {
        let (_dir, registry, service) = setup();
        store(&registry, "churn", &["age", "tenure"]);

        let response = service
            .predict(&request("churn", &["age", "plan"], vec![1.0, 2.0]))
            .unwrap();
        assert_eq!(response.message, MSG_MODEL_NOT_FOUND);
    }

    #[test]
    fn test_corrupt_artifact_is_an_error() {
        let (_dir, registry, service) = setup();
        let fp = fingerprint(&["age"]);
        fs::write(registry.root().join(format!("churn__20250101-000000-000__{}.json", fp)), b"oops").unwrap();

        let err = service.predict(&request("churn", &["age"], vec![1.0])).unwrap_err();
        assert!(err.is_artifact_corrupt());
    }

    #[test]
    fn test_fingerprint_hit_with_other_names_is_a_schema_mismatch() {
        let (_dir, registry, service) = setup();
        let fp = fingerprint(&["a", "b"]);
        let artifact = ModelArtifact::new(FirstValue, names(&["b", "c"]), "k", Map::new(), Map::new());
        registry
            .write(&artifact, &format!("k__20250101-000000-000__{}.json", fp))
            .unwrap();

        let response = service.predict(&request("k", &["a", "b"], vec![1.0, 2.0])).unwrap();
        assert!(!response.ok);
        assert_eq!(response.message, MSG_SCHEMA_MISMATCH);
        assert_eq!(response.score, 0.0);
        assert_eq!(response.debug["expected"], json!(["b", "c"]));
        assert_eq!(response.debug["got"], json!(["a", "b"]));
        assert_eq!(response.debug["schemaHash"], fp);
        assert!(response.model_version.is_none());
    }

    #[test]
    fn test_split_past_last_feature_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(ModelRegistry::open(dir.path()).unwrap());
        let service = PredictionService::<Booster>::new(registry.clone());

        let model: Booster = serde_json::from_value(json!({
            "feature_names": ["a"],
            "trees": [{"Split": {
                "feature": 7,
                "threshold": 0.5,
                "left": {"Leaf": {"weight": 1.0}},
                "right": {"Leaf": {"weight": -1.0}}
            }}],
            "eta": 0.3,
            "base_margin": 0.0
        }))
        .unwrap();
        let artifact = ModelArtifact::new(model, names(&["a"]), "k", Map::new(), Map::new());
        registry.store(&artifact).unwrap();

        let err = service.predict(&request("k", &["a"], vec![1.0])).unwrap_err();
        assert!(err.is_artifact_corrupt());
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&names(&["a", "b"]), &names(&["b", "a"])));
        assert!(is_permutation(&names(&["a", "b"]), &names(&["a", "b"])));
        assert!(!is_permutation(&names(&["a", "a"]), &names(&["a", "b"])));
        assert!(!is_permutation(&names(&["a"]), &names(&["a", "b"])));
    }
}
