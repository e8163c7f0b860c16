//! Environment-level overrides
//!
//! The storage root has a dedicated variable that predates the layered
//! settings and still takes precedence over them.

use std::path::PathBuf;

use crate::defaults::Settings;

/// Storage root override
pub const MODELS_DIR_ENV: &str = "ML_MODELS_DIR";

/// Path of an optional settings file
pub const CONFIG_FILE_ENV: &str = "MODEL_REGISTRY_CONFIG";

/// Prefix of layered settings variables (`MODEL_REGISTRY__SERVER__PORT`)
pub const ENV_PREFIX: &str = "MODEL_REGISTRY";

/// Separator between nested keys in settings variables
pub const ENV_SEPARATOR: &str = "__";

/// Applies the dedicated overrides found through `lookup`
///
/// Blank values are treated as unset.
pub fn apply_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(MODELS_DIR_ENV).filter(|v| !v.trim().is_empty()) {
        settings.models_dir = Some(PathBuf::from(dir.trim()));
    }
}

/// Reads a variable from the process environment
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
