use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ndarray::ShapeError;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model not found at path: {0}")]
    ModelNotFound(String),

    #[error("Unsupported weight file format: {0}")]
    UnsupportedWeights(String),

    #[error("Model error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("{0}")]
    ImageError(#[from] image::ImageError),

    #[error("Output shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Model produced a non-finite output: {0}")]
    NonFiniteOutput(f32),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Shape error: {0}")]
    ShapeError(#[from] ShapeError),

    #[error("No file uploaded in form field '{0}'")]
    MissingUpload(&'static str),

    #[error("{0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    MultipartRejection(#[from] MultipartRejection),

    #[error("Inference task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for InferenceError {
    fn into_response(self) -> Response {
        // Client and server faults share one error class on the wire.
        let body = Json(json!({
            "detail": self.to_string()
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unknown device '{0}', expected cpu, cuda[:N] or metal[:N]")]
    InvalidDevice(String),
}
