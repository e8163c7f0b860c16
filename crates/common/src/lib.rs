//! Common utilities and types for the model registry
//!
//! This crate provides shared functionality used across the registry,
//! including the error type, wire models, hyperparameters and small helpers.

pub mod error;
pub mod models;
pub mod params;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::*;
pub use params::{Hyperparameters, ParamError};
pub use types::*;
