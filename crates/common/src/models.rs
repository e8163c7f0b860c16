//! Wire models for the model registry
//!
//! Request and response bodies shared by the services, the REST surface
//! and the command line. Field names follow the JSON spelling existing
//! clients already send. Success and failure use the same response shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message returned by a successful training call
pub const MSG_TRAINED: &str = "trained";

/// Message returned by a successful prediction call
pub const MSG_OK: &str = "ok";

/// No artifact exists for the model key and schema fingerprint
pub const MSG_MODEL_NOT_FOUND: &str = "model not found";

/// The stored feature order differs from the requested one
pub const MSG_SCHEMA_MISMATCH: &str = "schema mismatch";

/// Training request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainRequest {
    /// Caller-chosen identifier grouping every version of a model
    #[serde(default)]
    pub model_key: String,
    /// Ordered feature names
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Feature matrix, one row per sample
    #[serde(rename = "X", default)]
    pub x: Vec<Vec<f64>>,
    /// Binary labels, one per row
    #[serde(default)]
    pub y: Vec<i64>,
    /// Hyperparameter overlay
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Free-form provenance metadata stored with the artifact
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// Training response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainResponse {
    /// Whether an artifact was stored
    pub ok: bool,
    /// Full path of the stored artifact
    pub model_path: Option<String>,
    /// Artifact file name, used as the version identifier
    pub model_version: Option<String>,
    /// Row count, feature count and schema fingerprint
    #[serde(default)]
    pub metrics: Map<String, Value>,
    /// Human-readable outcome
    pub message: String,
}

impl TrainResponse {
    /// Creates a failure response
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            model_path: None,
            model_version: None,
            metrics: Map::new(),
            message: message.into(),
        }
    }

    /// Creates a success response
    pub fn success(model_path: String, model_version: String, metrics: Map<String, Value>) -> Self {
        Self {
            ok: true,
            model_path: Some(model_path),
            model_version: Some(model_version),
            metrics,
            message: MSG_TRAINED.to_string(),
        }
    }
}

/// Prediction request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    /// Model key to score against
    #[serde(default)]
    pub model_key: String,
    /// Ordered feature names
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Single feature vector, aligned with `feature_names`
    #[serde(default)]
    pub x: Vec<f64>,
    /// Free-form caller metadata
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// Prediction response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    /// Whether a score was produced
    pub ok: bool,
    /// Score in `[0, 1]`; `0.0` on failure
    #[serde(default)]
    pub score: f64,
    /// File name of the artifact that produced the score
    pub model_version: Option<String>,
    /// Diagnostics such as the schema fingerprint
    #[serde(default)]
    pub debug: Map<String, Value>,
    /// Human-readable outcome
    pub message: String,
}

impl PredictResponse {
    /// Creates a failure response without diagnostics
    pub fn failure(message: impl Into<String>) -> Self {
        Self::failure_with(message, Map::new())
    }

    /// Creates a failure response carrying diagnostics
    pub fn failure_with(message: impl Into<String>, debug: Map<String, Value>) -> Self {
        Self {
            ok: false,
            score: 0.0,
            model_version: None,
            debug,
            message: message.into(),
        }
    }

    /// Creates a success response
    pub fn success(score: f64, model_version: String, debug: Map<String, Value>) -> Self {
        Self {
            ok: true,
            score,
            model_version: Some(model_version),
            debug,
            message: MSG_OK.to_string(),
        }
    }
}

/// Liveness probe body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Always true while the process answers
    pub ok: bool,
    /// Current time in epoch milliseconds
    pub ts: i64,
    /// Service version
    pub version: String,
    /// Resolved storage root
    pub models_dir: String,
}
