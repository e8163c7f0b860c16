//! Configuration management for the model registry
//!
//! This crate provides the layered settings used by the registry, with
//! support for a settings file and environment overrides.

pub mod defaults;
pub mod environment;
pub mod manager;

// Re-export commonly used types
pub use defaults::{LogFormat, LoggingSettings, ServerSettings, Settings};
pub use manager::ConfigManager;
