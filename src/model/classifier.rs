use crate::error::InferenceError;
use crate::model::resnet::ResNet;
use candle_core::{Device, Module, Tensor};
use ndarray::Array4;
use serde::Serialize;

/// Fixed decision boundary, inclusive on the positive side.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Anything that maps a preprocessed `[1, 1, 224, 224]` tensor to one logit.
///
/// Implementations are shared across requests without locking, so `logit`
/// must not mutate state.
pub trait Classifier: Send + Sync {
    fn logit(&self, input: &Array4<f32>) -> Result<f32, InferenceError>;
}

/// The loaded network together with the device its weights live on.
pub struct ModelHandle {
    model: ResNet,
    device: Device,
}

impl ModelHandle {
    pub fn new(model: ResNet, device: Device) -> Self {
        Self { model, device }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Classifier for ModelHandle {
    fn logit(&self, input: &Array4<f32>) -> Result<f32, InferenceError> {
        let data = input.as_slice().ok_or_else(|| {
            InferenceError::PreprocessingError("input tensor is not contiguous".to_string())
        })?;
        let xs = Tensor::from_slice(data, input.shape(), &self.device)?;

        let output = self.model.forward(&xs)?;
        if output.dims() != &[1, 1] {
            return Err(InferenceError::ShapeMismatch {
                expected: vec![1, 1],
                got: output.dims().to_vec(),
            });
        }

        Ok(output.flatten_all()?.to_vec1::<f32>()?[0])
    }
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "UPPERCASE")]
pub enum Diagnosis {
    Cancer,
    Normal,
}

impl Diagnosis {
    pub fn as_str(self) -> &'static str {
        match self {
            Diagnosis::Cancer => "CANCER",
            Diagnosis::Normal => "NORMAL",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Prediction {
    pub probability: f32,
    pub diagnosis: Diagnosis,
}

impl Prediction {
    /// Converts a raw logit into a probability and a thresholded label.
    pub fn from_logit(logit: f32) -> Result<Self, InferenceError> {
        if logit.is_nan() {
            return Err(InferenceError::NonFiniteOutput(logit));
        }

        let probability = sigmoid(logit);
        let diagnosis = if probability >= DECISION_THRESHOLD {
            Diagnosis::Cancer
        } else {
            Diagnosis::Normal
        };

        Ok(Self {
            probability,
            diagnosis,
        })
    }

    /// Probability rounded to 4 decimal digits for reporting.
    pub fn rounded_probability(&self) -> f64 {
        (f64::from(self.probability) * 10_000.0).round() / 10_000.0
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
