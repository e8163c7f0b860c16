//! Training and scoring capabilities
//!
//! The registry only ever talks to a [`Trainer`] and the [`Scorer`] it
//! produces. [`GbdtTrainer`] is the built-in implementation: a
//! second-order gradient-boosted tree ensemble with logistic loss.

pub mod booster;
pub mod capability;
pub mod histogram;
pub mod metrics;
pub mod tree;

// Re-export commonly used types
pub use booster::{Booster, GbdtTrainer};
pub use capability::{Scorer, Trainer};
