//! Subscriber initialisation

use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use common::error::{Error, Result};
use registry_config::{LogFormat, LoggingSettings};

/// Builds the event filter: `RUST_LOG` wins, else the configured level
pub fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| Error::Config(format!("invalid log level '{}': {}", settings.level, e))),
    }
}

/// Installs the global subscriber, writing to stderr
///
/// Returns `Ok(false)` when a subscriber was already installed, which
/// happens when the registry is embedded or initialised twice in tests.
pub fn init(settings: &LoggingSettings) -> Result<bool> {
    let filter = build_filter(settings)?;

    let installed = match settings.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    };

    debug!(format = %settings.format, installed, "Logging initialised");

    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let settings = LoggingSettings {
            level: "registry=loud".to_string(),
            format: LogFormat::Text,
        };
        assert!(matches!(build_filter(&settings), Err(Error::Config(_))));
    }

    #[test]
    fn test_second_init_is_noop() {
        let settings = LoggingSettings::default();
        let _ = init(&settings).unwrap();
        assert!(!init(&settings).unwrap());
    }
}
