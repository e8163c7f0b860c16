//! Core services of the model registry
//!
//! The training and prediction services turn wire requests into artifact
//! writes and scored lookups. The engine bundles both over one storage root
//! and is what the REST and command-line surfaces drive.

pub mod engine;
pub mod prediction;
pub mod training;

// Re-export commonly used types
pub use engine::RegistryEngine;
pub use prediction::PredictionService;
pub use training::TrainingService;
