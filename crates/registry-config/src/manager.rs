//! Configuration manager
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional settings file, then `MODEL_REGISTRY__*` variables, then the
//! dedicated overrides in [`crate::environment`]. They are loaded once at
//! start-up and handed to the components that need them.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use common::error::{Error, Result};

use crate::defaults::Settings;
use crate::environment::{self, CONFIG_FILE_ENV, ENV_PREFIX, ENV_SEPARATOR};

/// Read-only view of the resolved settings
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Resolved settings
    settings: Settings,

    /// Settings file that contributed, if any
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Loads settings from the process environment and an optional file
    ///
    /// An explicit `file` must exist; a file named by `MODEL_REGISTRY_CONFIG`
    /// is used when no explicit file is given.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let source_file = file
            .map(Path::to_path_buf)
            .or_else(|| environment::process_env(CONFIG_FILE_ENV).map(PathBuf::from));

        Self::load_with(source_file, environment::process_env)
    }

    /// Loads settings using `lookup` for the dedicated overrides
    pub fn load_with<F>(source_file: Option<PathBuf>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder();

        if let Some(path) = &source_file {
            debug!("Reading settings file {:?}", path);
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let mut settings: Settings = builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;

        environment::apply_overrides(&mut settings, lookup);

        info!(
            "Configuration loaded (file: {:?}, models_dir override: {:?})",
            source_file, settings.models_dir
        );

        Ok(Self {
            settings,
            source_file,
        })
    }

    /// Wraps already-built settings
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            source_file: None,
        }
    }

    /// Gets the resolved settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the settings file that contributed, if any
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Gets the configured storage root override
    pub fn models_dir_override(&self) -> Option<&Path> {
        self.settings.models_dir.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::LogFormat;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "models_dir = \"/srv/models\"").unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "port = 9001").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "format = \"json\"").unwrap();
        drop(file);

        let manager = ConfigManager::load_with(Some(path.clone()), |_| None).unwrap();
        assert_eq!(manager.models_dir_override(), Some(Path::new("/srv/models")));
        assert_eq!(manager.settings().server.port, 9001);
        assert_eq!(manager.settings().server.host, "0.0.0.0");
        assert_eq!(manager.settings().logging.format, LogFormat::Json);
        assert_eq!(manager.source_file(), Some(path.as_path()));
    }

    #[test]
    fn test_env_override_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "models_dir = \"/srv/models\"\n").unwrap();

        let manager = ConfigManager::load_with(Some(path), |name| {
            (name == environment::MODELS_DIR_ENV).then(|| "/tmp/override".to_string())
        })
        .unwrap();
        assert_eq!(manager.models_dir_override(), Some(Path::new("/tmp/override")));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = ConfigManager::load_with(Some(PathBuf::from("/nonexistent/registry.toml")), |_| None)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
