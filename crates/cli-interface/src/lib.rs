//! Command-line interface for the model registry
//!
//! Parses the command line and runs one command against a registry engine:
//! serving the REST API, or training, scoring and listing directly from
//! request files.

pub mod cli;
pub mod commands;
pub mod formatters;

// Re-export commonly used types
pub use cli::{Cli, Command};
pub use commands::execute;
