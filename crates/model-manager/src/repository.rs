//! Model registry storage
//!
//! The registry owns a single flat directory of artifact files. Artifacts
//! are immutable once published: a write never replaces an existing file,
//! and a file only appears under its final name once fully written.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use common::error::{Error, Result};
use registry_config::ConfigManager;

use crate::metadata::ModelArtifact;
use crate::schema;
use crate::versioning::{self, ArtifactEntry};

/// Storage directory used when no override is configured, relative to the
/// directory holding the running binary
pub const DEFAULT_MODELS_DIR: &str = "../ml-models";

/// Collision attempts before a write gives up
pub const MAX_WRITE_ATTEMPTS: u32 = 16;

// Temporary files are hidden and never carry the artifact extension.
const INCOMING_PREFIX: &str = ".incoming-";
const INCOMING_SUFFIX: &str = ".tmp";

/// Location of a freshly published artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Absolute path of the artifact file
    pub path: PathBuf,

    /// File name, which doubles as the version identifier
    pub file_name: String,
}

/// Listing entry derived from an artifact's file name and metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    /// File name
    pub file_name: String,

    /// Absolute path
    pub path: String,

    /// Sanitised model key segment
    pub model_key: String,

    /// Version segment
    pub version: String,

    /// Schema fingerprint segment
    pub schema_hash: String,

    /// Modification time in milliseconds since the Unix epoch
    pub modified_ms: i64,

    /// File size in bytes
    pub size_bytes: u64,
}

impl From<ArtifactEntry> for ArtifactSummary {
    fn from(entry: ArtifactEntry) -> Self {
        let modified_ms = entry
            .modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Self {
            file_name: entry.file_name,
            path: entry.path.to_string_lossy().into_owned(),
            model_key: entry.name.key,
            version: entry.name.version,
            schema_hash: entry.name.schema_hash,
            modified_ms,
            size_bytes: entry.size_bytes,
        }
    }
}

/// Directory-backed artifact store
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    /// Absolute storage root
    root: PathBuf,
}

impl ModelRegistry {
    /// Opens the registry at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .map_err(|e| Error::Config(format!("cannot create models directory {:?}: {}", root, e)))?;
        let root = root
            .canonicalize()
            .map_err(|e| Error::Config(format!("cannot resolve models directory {:?}: {}", root, e)))?;

        info!("Model registry at {:?}", root);
        Ok(Self { root })
    }

    /// Opens the registry at the root resolved from configuration
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        Self::open(Self::resolve_root(config)?)
    }

    /// Storage root: the configured override, else [`DEFAULT_MODELS_DIR`]
    /// next to the running binary
    pub fn resolve_root(config: &ConfigManager) -> Result<PathBuf> {
        if let Some(dir) = config.models_dir_override() {
            debug!("Using configured models directory {:?}", dir);
            return Ok(dir.to_path_buf());
        }

        let exe = std::env::current_exe()
            .map_err(|e| Error::Config(format!("cannot locate the running binary: {}", e)))?;
        let base = exe
            .parent()
            .ok_or_else(|| Error::Config(format!("binary path {:?} has no parent", exe)))?;
        Ok(base.join(DEFAULT_MODELS_DIR))
    }

    /// Absolute storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Publishes `artifact` under `file_name`
    ///
    /// Fails with [`Error::AlreadyExists`] instead of replacing a file.
    pub fn write<M: Serialize>(&self, artifact: &ModelArtifact<M>, file_name: &str) -> Result<PathBuf> {
        let target = self.root.join(file_name);
        let bytes = serde_json::to_vec(artifact)?;

        let mut incoming = tempfile::Builder::new()
            .prefix(INCOMING_PREFIX)
            .suffix(INCOMING_SUFFIX)
            .tempfile_in(&self.root)?;
        incoming.write_all(&bytes)?;
        incoming.as_file().sync_all()?;

        match incoming.persist_noclobber(&target) {
            Ok(_) => {
                debug!("Wrote {} bytes to {:?}", bytes.len(), target);
                Ok(target)
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::AlreadyExists(target.display().to_string()))
            }
            Err(e) => Err(Error::Io(e.error)),
        }
    }

    /// Publishes `artifact` under a fresh versioned name
    ///
    /// The name is derived from the artifact's key and schema fingerprint;
    /// on collision a counter is appended to the version stamp.
    pub fn store<M: Serialize>(&self, artifact: &ModelArtifact<M>) -> Result<StoredArtifact> {
        self.store_at(artifact, Utc::now())
    }

    fn store_at<M: Serialize>(&self, artifact: &ModelArtifact<M>, at: DateTime<Utc>) -> Result<StoredArtifact> {
        for attempt in 0..MAX_WRITE_ATTEMPTS {
            let file_name = versioning::build_filename_at(&artifact.model_key, &artifact.schema_hash, at, attempt);
            match self.write(artifact, &file_name) {
                Ok(path) => return Ok(StoredArtifact { path, file_name }),
                Err(e) if e.is_already_exists() => {
                    warn!("Artifact name {} taken, retrying", file_name);
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::AlreadyExists(format!(
            "no free artifact name for {:?} after {} attempts",
            artifact.model_key, MAX_WRITE_ATTEMPTS
        )))
    }

    /// Loads the artifact at `path`
    pub fn read<M: DeserializeOwned>(&self, path: &Path) -> Result<ModelArtifact<M>> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;

        let artifact: ModelArtifact<M> = serde_json::from_slice(&bytes)
            .map_err(|e| Error::ArtifactCorrupt(format!("{}: {}", path.display(), e)))?;

        if !artifact.is_consistent() {
            return Err(Error::ArtifactCorrupt(format!(
                "{}: schema hash {} does not match its feature names",
                path.display(),
                artifact.schema_hash
            )));
        }

        Ok(artifact)
    }

    /// Path of the newest artifact for `model_key` and `schema_hash`
    pub fn find_latest(&self, model_key: &str, schema_hash: &str) -> Result<Option<PathBuf>> {
        versioning::find_latest(&self.root, model_key, schema_hash)
    }

    /// Newest artifact path of every schema stored under `model_key`
    pub fn latest_per_schema(&self, model_key: &str) -> Result<Vec<PathBuf>> {
        Ok(versioning::latest_per_schema(&self.root, model_key)?
            .into_iter()
            .map(|entry| entry.path)
            .collect())
    }

    /// Artifacts newest first, optionally narrowed to a key and fingerprint
    ///
    /// A fingerprint filter that is not 10 lowercase hex characters is an
    /// `InvalidArgument` error rather than an empty listing.
    pub fn list(&self, model_key: Option<&str>, schema_hash: Option<&str>) -> Result<Vec<ArtifactSummary>> {
        if let Some(hash) = schema_hash.filter(|h| !schema::is_fingerprint(h)) {
            return Err(Error::InvalidArgument(format!(
                "schemaHash {:?} is not a {}-character lowercase hex fingerprint",
                hash,
                schema::FINGERPRINT_LEN
            )));
        }

        let key = model_key.map(versioning::sanitize_key);

        let mut entries: Vec<ArtifactEntry> = versioning::scan(&self.root)?
            .into_iter()
            .filter(|entry| key.as_deref().map_or(true, |k| entry.name.key == k))
            .filter(|entry| schema_hash.map_or(true, |h| entry.name.schema_hash == h))
            .collect();
        entries.sort_by(versioning::newest_first);

        Ok(entries.into_iter().map(ArtifactSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fingerprint;
    use chrono::TimeZone;
    use registry_config::Settings;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn artifact(key: &str, features: &[&str]) -> ModelArtifact<Vec<f64>> {
        let mut params = Map::new();
        params.insert("n_estimators".into(), json!(300));
        ModelArtifact::new(vec![0.25, -1.5], names(features), key, Map::new(), params)
    }

    fn registry() -> (TempDir, ModelRegistry) {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("models");
        let registry = ModelRegistry::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(registry.root().is_absolute());
    }

    #[test]
    fn test_resolve_root_prefers_override() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            models_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let config = ConfigManager::from_settings(settings);
        assert_eq!(ModelRegistry::resolve_root(&config).unwrap(), dir.path());
    }

    #[test]
    fn test_resolve_root_defaults_next_to_binary() {
        let config = ConfigManager::from_settings(Settings::default());
        let root = ModelRegistry::resolve_root(&config).unwrap();
        assert!(root.ends_with("ml-models"));
        assert!(root.is_absolute());
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, registry) = registry();
        let original = artifact("churn", &["a", "b"]);

        let path = registry.write(&original, "churn__v1__x.json").unwrap();
        let loaded: ModelArtifact<Vec<f64>> = registry.read(&path).unwrap();

        assert_eq!(loaded.model, original.model);
        assert_eq!(loaded.feature_names, original.feature_names);
        assert_eq!(loaded.schema_hash, fingerprint(&["a", "b"]));
        assert_eq!(loaded.params["n_estimators"], 300);
    }

    #[test]
    fn test_write_never_overwrites() {
        let (_dir, registry) = registry();
        registry.write(&artifact("k", &["a"]), "k__v__h.json").unwrap();

        let err = registry.write(&artifact("k", &["b"]), "k__v__h.json").unwrap_err();
        assert!(err.is_already_exists());

        let kept: ModelArtifact<Vec<f64>> = registry.read(&registry.root().join("k__v__h.json")).unwrap();
        assert_eq!(kept.feature_names, names(&["a"]));
    }

    #[test]
    fn test_write_leaves_no_temporary_files() {
        let (_dir, registry) = registry();
        registry.write(&artifact("k", &["a"]), "k__v__h.json").unwrap();

        let files: Vec<String> = fs::read_dir(registry.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec!["k__v__h.json".to_string()]);
    }

    #[test]
    fn test_store_retries_on_collision() {
        let (_dir, registry) = registry();
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let bundle = artifact("churn", &["a"]);

        let first = registry.store_at(&bundle, at).unwrap();
        let second = registry.store_at(&bundle, at).unwrap();

        let fp = &bundle.schema_hash;
        assert_eq!(first.file_name, format!("churn__20250102-030405-000__{}.json", fp));
        assert_eq!(second.file_name, format!("churn__20250102-030405-000-1__{}.json", fp));
        assert_ne!(first.path, second.path);
        let latest = registry.find_latest("churn", &bundle.schema_hash).unwrap();
        assert_eq!(latest, Some(second.path));
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, registry) = registry();
        let err = registry
            .read::<Vec<f64>>(&registry.root().join("nope__v__h.json"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_garbage_is_corrupt() {
        let (_dir, registry) = registry();
        let path = registry.root().join("k__v__h.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(registry.read::<Vec<f64>>(&path).unwrap_err().is_artifact_corrupt());

        let mut tampered = serde_json::to_value(artifact("k", &["a"])).unwrap();
        tampered["schemaHash"] = json!("ffffffffff");
        fs::write(&path, serde_json::to_vec(&tampered).unwrap()).unwrap();
        assert!(registry.read::<Vec<f64>>(&path).unwrap_err().is_artifact_corrupt());
    }

    #[test]
    fn test_list_filters_and_orders() {
        let (_dir, registry) = registry();
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let a = artifact("churn", &["a"]);
        let b = artifact("churn", &["b"]);

        registry.store_at(&a, at).unwrap();
        registry.store_at(&a, at).unwrap();
        registry.store_at(&b, at).unwrap();
        registry.store_at(&artifact("other", &["a"]), at).unwrap();
        fs::write(registry.root().join("README.txt"), b"hi").unwrap();

        assert_eq!(registry.list(None, None).unwrap().len(), 4);
        assert_eq!(registry.list(Some("churn"), None).unwrap().len(), 3);

        let only_a = registry.list(Some("churn"), Some(&a.schema_hash)).unwrap();
        assert_eq!(only_a.len(), 2);
        assert!(only_a.iter().all(|s| s.model_key == "churn" && s.schema_hash == a.schema_hash));
        assert!(only_a[0].modified_ms >= only_a[1].modified_ms);
        assert!(only_a[0].size_bytes > 0);
    }

    #[test]
    fn test_list_rejects_malformed_fingerprint() {
        let (_dir, registry) = registry();
        for bad in ["", "abc", "ABCDEF0123", "not-a-hash"] {
            let err = registry.list(Some("churn"), Some(bad)).unwrap_err();
            assert!(err.is_invalid_argument(), "{:?} accepted", bad);
        }
        assert!(registry.list(None, Some("0123456789")).unwrap().is_empty());
    }
}
