use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::InferenceError;
use crate::model::classifier::Prediction;
use crate::server::types::*;

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

pub const STATUS_MESSAGE: &str = "Backend running 🚀";

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: STATUS_MESSAGE,
    })
}

pub async fn render_metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, InferenceError> {
    match run_prediction(state, multipart).await {
        Ok(prediction) => {
            counter!(
                "boneguard_predictions_total",
                "prediction" => prediction.diagnosis.as_str()
            )
            .increment(1);
            debug!(
                probability = prediction.probability,
                prediction = prediction.diagnosis.as_str(),
                "Prediction served"
            );
            Ok(Json(prediction.into()))
        }
        Err(error) => {
            counter!("boneguard_prediction_errors_total").increment(1);
            warn!(%error, "Prediction failed");
            Err(error)
        }
    }
}

async fn run_prediction(
    state: Arc<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Prediction, InferenceError> {
    // 1. Read upload
    let image_bytes = read_upload(multipart?).await?;

    // 2. Preprocess & inference off the async workers
    let classifier = Arc::clone(&state.classifier);
    let start = Instant::now();
    let prediction = tokio::task::spawn_blocking(move || {
        let input_tensor = crate::preprocessing::image::process_bytes(&image_bytes)?;
        let logit = classifier.logit(&input_tensor)?;
        Prediction::from_logit(logit)
    })
    .await??;

    histogram!("boneguard_inference_duration_seconds").record(start.elapsed().as_secs_f64());

    Ok(prediction)
}

/// Pulls the bytes of the `file` field, ignoring any other fields.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, InferenceError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await?;
            debug!(bytes = bytes.len(), "Received upload");
            return Ok(bytes.to_vec());
        }
    }

    Err(InferenceError::MissingUpload(UPLOAD_FIELD))
}
