//! Model artifact management for the model registry
//!
//! This crate owns everything about artifacts at rest: how a feature schema
//! is fingerprinted, how artifact files are named and selected, what an
//! artifact bundle contains, and the storage directory that holds them.

pub mod metadata;
pub mod repository;
pub mod schema;
pub mod versioning;

// Re-export commonly used types
pub use metadata::ModelArtifact;
pub use repository::{ArtifactSummary, ModelRegistry, StoredArtifact};
pub use schema::fingerprint;
pub use versioning::ArtifactName;
