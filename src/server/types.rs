use crate::model::classifier::{Classifier, Diagnosis, Prediction};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;

/// Shared Application State
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub metrics: PrometheusHandle,
}

// --- DTOs (Data Transfer Objects) ---

#[derive(Serialize, Debug)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct PredictResponse {
    /// Sigmoid of the logit, rounded to 4 decimals
    pub probability: f64,
    pub prediction: Diagnosis,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            probability: prediction.rounded_probability(),
            prediction: prediction.diagnosis,
        }
    }
}
