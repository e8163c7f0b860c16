//! Artifact naming and version selection
//!
//! Artifact files are named `{key}__{version}__{schema}.{ext}` where `key`
//! is the sanitised model key, `version` a UTC timestamp stamp and `schema`
//! the feature-schema fingerprint. The newest artifact for a key and schema
//! is the matching file with the greatest modification time.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::debug;

use common::error::Result;

/// File extension of every artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// Separates the three segments of an artifact name
pub const SEGMENT_SEPARATOR: &str = "__";

/// Timestamp layout of the version segment
pub const VERSION_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

// Length of a stamp rendered with VERSION_STAMP_FORMAT.
const VERSION_STAMP_LEN: usize = 19;

/// Replaces every character outside `[alphanumeric, '-', '_', '|']` with `_`
pub fn sanitize_key(model_key: &str) -> String {
    model_key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '|') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Version stamp for `at`; `attempt > 0` appends a collision counter
pub fn version_stamp(at: DateTime<Utc>, attempt: u32) -> String {
    let stamp = at.format(VERSION_STAMP_FORMAT).to_string();
    if attempt == 0 {
        stamp
    } else {
        format!("{}-{}", stamp, attempt)
    }
}

/// Builds an artifact filename for an explicit time and collision attempt
pub fn build_filename_at(model_key: &str, schema_hash: &str, at: DateTime<Utc>, attempt: u32) -> String {
    format!(
        "{key}{sep}{version}{sep}{schema}.{ext}",
        key = sanitize_key(model_key),
        sep = SEGMENT_SEPARATOR,
        version = version_stamp(at, attempt),
        schema = schema_hash,
        ext = ARTIFACT_EXTENSION,
    )
}

/// The three segments of an artifact filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    /// Sanitised model key
    pub key: String,

    /// Version stamp
    pub version: String,

    /// Schema fingerprint
    pub schema_hash: String,
}

impl ArtifactName {
    /// Splits an artifact filename; `None` for anything else in the directory
    ///
    /// The key may itself contain `__`, so the version and schema segments are
    /// taken from the right.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(&format!(".{}", ARTIFACT_EXTENSION))?;
        let (rest, schema_hash) = stem.rsplit_once(SEGMENT_SEPARATOR)?;
        let (key, version) = rest.rsplit_once(SEGMENT_SEPARATOR)?;
        if key.is_empty() || version.is_empty() || schema_hash.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            version: version.to_string(),
            schema_hash: schema_hash.to_string(),
        })
    }

    /// Timestamp and collision counter of the version segment
    pub fn version_order(&self) -> (&str, u32) {
        let stamp = self.version.get(..VERSION_STAMP_LEN).unwrap_or(&self.version);
        let attempt = self
            .version
            .get(VERSION_STAMP_LEN..)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        (stamp, attempt)
    }
}

/// A directory entry recognised as an artifact
#[derive(Debug, Clone)]
pub struct ArtifactEntry {
    /// Full path of the file
    pub path: PathBuf,

    /// File name
    pub file_name: String,

    /// Parsed name segments
    pub name: ArtifactName,

    /// Last modification time
    pub modified: SystemTime,

    /// File size in bytes
    pub size_bytes: u64,
}

/// Scans `root` for regular files with artifact-shaped names
///
/// Entries that vanish or cannot be inspected mid-scan are skipped.
pub fn scan(root: &Path) -> Result<Vec<ArtifactEntry>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {:?}: {}", root, e);
                continue;
            }
        };

        let file_name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        let name = match ArtifactName::parse(&file_name) {
            Some(name) => name,
            None => continue,
        };

        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                debug!("Skipping {:?}: {}", file_name, e);
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                debug!("Skipping {:?}: no modification time: {}", file_name, e);
                continue;
            }
        };

        entries.push(ArtifactEntry {
            path: entry.path(),
            file_name,
            name,
            modified,
            size_bytes: metadata.len(),
        });
    }

    Ok(entries)
}

/// Whether `entry` belongs to `model_key` and `schema_hash`
pub fn matches(entry: &ArtifactEntry, model_key: &str, schema_hash: &str) -> bool {
    let key = sanitize_key(model_key);
    let prefix = format!("{}{}", key, SEGMENT_SEPARATOR);
    let suffix = format!("{}{}.{}", SEGMENT_SEPARATOR, schema_hash, ARTIFACT_EXTENSION);

    // The prefix alone would also accept keys that extend this one past a
    // "__", so the parsed key must match exactly.
    entry.file_name.starts_with(&prefix)
        && entry.file_name.ends_with(&suffix)
        && entry.name.key == key
}

/// Newest-first ordering: modification time, then version, then filename
pub fn newest_first(a: &ArtifactEntry, b: &ArtifactEntry) -> std::cmp::Ordering {
    b.modified
        .cmp(&a.modified)
        .then_with(|| b.name.version_order().cmp(&a.name.version_order()))
        .then_with(|| b.file_name.cmp(&a.file_name))
}

/// Path of the newest artifact for `model_key` and `schema_hash`, if any
pub fn find_latest(root: &Path, model_key: &str, schema_hash: &str) -> Result<Option<PathBuf>> {
    let latest = scan(root)?
        .into_iter()
        .filter(|entry| matches(entry, model_key, schema_hash))
        .min_by(newest_first);

    if let Some(entry) = &latest {
        debug!("Latest artifact for {:?}/{}: {}", model_key, schema_hash, entry.file_name);
    }

    Ok(latest.map(|entry| entry.path))
}

/// Newest artifact of every schema stored under `model_key`, newest first
pub fn latest_per_schema(root: &Path, model_key: &str) -> Result<Vec<ArtifactEntry>> {
    let key = sanitize_key(model_key);
    let mut entries: Vec<ArtifactEntry> = scan(root)?
        .into_iter()
        .filter(|entry| entry.name.key == key)
        .collect();
    entries.sort_by(newest_first);

    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.name.schema_hash.clone()));
    Ok(entries)
}
