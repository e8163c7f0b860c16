//! Local model registry
//!
//! Trains gradient-boosted binary classifiers, stores every fitted model as
//! an immutable artifact named by model key, version stamp and feature
//! schema fingerprint, and scores single rows against the newest artifact
//! whose schema matches the request exactly.
//!
//! The binary wires the workspace crates together: settings are resolved
//! once, logging is installed, the storage root is opened and the selected
//! command runs against one [`RegistryEngine`].

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

pub use api_gateway::{create_router, RestApi};
pub use boosting_engine::{Booster, GbdtTrainer, Scorer, Trainer};
pub use cli_interface::{Cli, Command};
pub use common::error::Error;
pub use common::models::{HealthStatus, PredictRequest, PredictResponse, TrainRequest, TrainResponse};
pub use model_manager::{fingerprint, ModelArtifact, ModelRegistry};
pub use registry_config::{ConfigManager, Settings};
pub use registry_core::RegistryEngine;

/// A configured registry ready to run commands
pub struct App {
    /// Resolved settings
    config: ConfigManager,

    /// Engine over the resolved storage root
    engine: Arc<RegistryEngine>,
}

impl App {
    /// Loads settings, installs logging and opens the storage root
    pub fn bootstrap(config_file: Option<&Path>) -> Result<Self> {
        let config = ConfigManager::load(config_file)?;
        logging::init(&config.settings().logging)?;
        Self::with_config(config)
    }

    /// Opens the storage root for already-loaded settings
    pub fn with_config(config: ConfigManager) -> Result<Self> {
        let engine = Arc::new(RegistryEngine::from_config(&config)?);
        info!(
            version = registry_core::engine::SERVICE_VERSION,
            models_dir = %engine.registry().root().display(),
            config_file = ?config.source_file(),
            "Model registry initialised"
        );
        Ok(Self { config, engine })
    }

    /// Resolved settings
    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    /// Shared engine
    pub fn engine(&self) -> Arc<RegistryEngine> {
        self.engine.clone()
    }

    /// Runs one command; returns whether it succeeded
    pub async fn run(&self, command: Command) -> Result<bool> {
        cli_interface::execute(command, self.engine(), self.config.settings()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_app_runs_offline_commands() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            models_dir: Some(dir.path().join("store")),
            ..Settings::default()
        };
        let app = App::with_config(ConfigManager::from_settings(settings)).unwrap();

        assert!(dir.path().join("store").is_dir());
        assert!(app.run(Command::Health).await.unwrap());
        let listed = app
            .run(Command::List {
                model_key: None,
                schema_hash: None,
            })
            .await;
        assert!(listed.unwrap());
    }
}
