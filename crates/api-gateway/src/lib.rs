//! REST API of the model registry
//!
//! Exposes training, prediction, artifact listing and a liveness probe over
//! HTTP. Handlers are thin: they move the request onto the blocking pool,
//! call the registry engine and serialise whatever it returns.

pub mod error;
pub mod handlers;
pub mod rest;
pub mod routes;

// Re-export commonly used types
pub use error::ApiError;
pub use handlers::AppState;
pub use rest::{shutdown_signal, RestApi};
pub use routes::create_router;
