pub mod config;
pub mod error;
pub mod model;
pub mod preprocessing;
pub mod server;
pub mod telemetry;

#[cfg(test)]
mod observability_tests;

// Re-export common types
pub use error::InferenceError;
pub use model::classifier::{Classifier, Diagnosis, ModelHandle, Prediction};
