//! Registry engine
//!
//! Wires the training and prediction services to one storage root and one
//! trainer. The engine holds no mutable state; the storage directory is the
//! only thing shared between concurrent calls.

use std::sync::Arc;

use tracing::info;

use common::error::Result;
use common::models::{HealthStatus, PredictRequest, PredictResponse, TrainRequest, TrainResponse};
use common::utils::now_ms;
use boosting_engine::{GbdtTrainer, Trainer};
use model_manager::{ArtifactSummary, ModelRegistry};
use registry_config::ConfigManager;

use crate::prediction::PredictionService;
use crate::training::TrainingService;

/// Version reported by the health probe
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Training, prediction and listing over a single artifact store
pub struct RegistryEngine<T: Trainer = GbdtTrainer> {
    /// Artifact store
    registry: Arc<ModelRegistry>,

    /// Training service
    training: TrainingService<T>,

    /// Prediction service
    prediction: PredictionService<T::Model>,
}

impl RegistryEngine<GbdtTrainer> {
    /// Creates an engine with the built-in trainer over the configured root
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        Ok(Self::with_registry(ModelRegistry::from_config(config)?))
    }

    /// Creates an engine with the built-in trainer over an opened registry
    pub fn with_registry(registry: ModelRegistry) -> Self {
        Self::new(registry, GbdtTrainer::new())
    }
}

impl<T: Trainer> RegistryEngine<T> {
    /// Creates a new engine
    pub fn new(registry: ModelRegistry, trainer: T) -> Self {
        let registry = Arc::new(registry);
        info!("Registry engine ready, models in {:?}", registry.root());

        Self {
            training: TrainingService::new(registry.clone(), Arc::new(trainer)),
            prediction: PredictionService::new(registry.clone()),
            registry,
        }
    }

    /// Trains and stores a new model version
    pub fn train(&self, request: TrainRequest) -> Result<TrainResponse> {
        self.training.train(request)
    }

    /// Scores one row with the newest compatible model
    pub fn predict(&self, request: &PredictRequest) -> Result<PredictResponse> {
        self.prediction.predict(request)
    }

    /// Stored artifacts, newest first
    pub fn list(&self, model_key: Option<&str>, schema_hash: Option<&str>) -> Result<Vec<ArtifactSummary>> {
        self.registry.list(model_key, schema_hash)
    }

    /// Liveness report
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            ok: true,
            ts: now_ms(),
            version: SERVICE_VERSION.to_string(),
            models_dir: self.registry.root().display().to_string(),
        }
    }

    /// Underlying artifact store
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }
}
