//! Model artifact bundle
//!
//! The bundle is what gets written to disk for every training: the fitted
//! model plus everything needed to validate a prediction request against
//! it later.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use common::utils::now_ms;

use crate::schema::fingerprint;

/// A persisted model together with its schema and provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelArtifact<M> {
    /// The fitted model
    pub model: M,

    /// Feature names in the order the model was fitted on
    pub feature_names: Vec<String>,

    /// Fingerprint of `feature_names`
    pub schema_hash: String,

    /// Model key as supplied by the caller, before sanitisation
    pub model_key: String,

    /// Creation time in milliseconds since the Unix epoch
    pub created_at_ms: i64,

    /// Opaque caller metadata, stored verbatim
    #[serde(default)]
    pub meta: Map<String, Value>,

    /// Effective hyperparameters used for the fit
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl<M> ModelArtifact<M> {
    /// Creates a new artifact stamped with the current time
    pub fn new(
        model: M,
        feature_names: Vec<String>,
        model_key: impl Into<String>,
        meta: Map<String, Value>,
        params: Map<String, Value>,
    ) -> Self {
        let schema_hash = fingerprint(&feature_names);
        Self {
            model,
            feature_names,
            schema_hash,
            model_key: model_key.into(),
            created_at_ms: now_ms(),
            meta,
            params,
        }
    }

    /// Whether `schema_hash` still agrees with `feature_names`
    pub fn is_consistent(&self) -> bool {
        fingerprint(&self.feature_names) == self.schema_hash
    }

    /// Exact, order-sensitive comparison with a request's feature names
    pub fn matches_schema(&self, feature_names: &[String]) -> bool {
        self.feature_names.as_slice() == feature_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_stamps_fingerprint_and_time() {
        let artifact = ModelArtifact::new(7u32, names(&["a", "b"]), "churn", Map::new(), Map::new());
        assert_eq!(artifact.schema_hash, fingerprint(&["a", "b"]));
        assert!(artifact.created_at_ms > 0);
        assert!(artifact.is_consistent());
    }

    #[test]
    fn test_matches_schema_is_order_sensitive() {
        let artifact = ModelArtifact::new((), names(&["a", "b"]), "k", Map::new(), Map::new());
        assert!(artifact.matches_schema(&names(&["a", "b"])));
        assert!(!artifact.matches_schema(&names(&["b", "a"])));
        assert!(!artifact.matches_schema(&names(&["a"])));
    }

    #[test]
    fn test_wire_field_names() {
        let mut meta = Map::new();
        meta.insert("owner".into(), json!("ml"));
        let artifact = ModelArtifact::new(1u8, names(&["x"]), "k", meta, Map::new());
        let value = serde_json::to_value(&artifact).unwrap();

        for key in ["model", "featureNames", "schemaHash", "modelKey", "createdAtMs", "meta", "params"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["meta"]["owner"], "ml");
    }

    #[test]
    fn test_tampered_hash_is_inconsistent() {
        let mut artifact = ModelArtifact::new((), names(&["x"]), "k", Map::new(), Map::new());
        artifact.schema_hash = "0000000000".to_string();
        assert!(!artifact.is_consistent());
    }
}
