//! Logging for the model registry
//!
//! This crate installs the process-wide `tracing` subscriber, with
//! structured JSON or human-readable output.

pub mod logger;

// Re-export commonly used types
pub use logger::init;
