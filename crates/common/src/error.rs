//! Error types for the common crate
//!
//! This module defines the error type shared by every model registry crate.
//! Only infrastructural failures travel through it; expected business
//! outcomes (empty inputs, unknown models, schema drift) are reported as
//! structured responses instead.

use thiserror::Error;

/// Result type for model registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for model registry operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored artifact bytes could not be decoded into a bundle
    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// Training or scoring engine failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Already exists error
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns true if the error is an already exists error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }

    /// Returns true if the stored artifact could not be decoded
    pub fn is_artifact_corrupt(&self) -> bool {
        matches!(self, Error::ArtifactCorrupt(_))
    }

    /// Returns true if the caller supplied something unusable
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        assert!(Error::NotFound("churn".to_string()).is_not_found());
        assert!(Error::AlreadyExists("a.json".to_string()).is_already_exists());
        assert!(Error::ArtifactCorrupt("bad".to_string()).is_artifact_corrupt());
        assert!(Error::InvalidArgument("x".to_string()).is_invalid_argument());
        assert!(!Error::Internal("x".to_string()).is_not_found());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }
}
