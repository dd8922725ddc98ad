use crate::config::{DeviceKind, ModelConfig};
use crate::error::InferenceError;
use crate::model::classifier::ModelHandle;
use crate::model::resnet::{Architecture, ResNet};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolves the configured device kind into a candle device.
///
/// Accelerators are only available when the crate is built with the matching
/// `cuda` or `metal` feature; otherwise this fails.
pub fn select_device(kind: DeviceKind) -> Result<Device, InferenceError> {
    let device = match kind {
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Cuda(ordinal) => Device::new_cuda(ordinal)?,
        DeviceKind::Metal(ordinal) => Device::new_metal(ordinal)?,
    };
    Ok(device)
}

/// Builds the network and loads trained weights from disk.
///
/// `.pth`, `.pt` and `.bin` files are read as PyTorch pickled state
/// dictionaries, `.safetensors` files are memory-mapped. Every parameter the
/// architecture asks for must be present with the exact shape.
///
/// # Arguments
/// * `weights_path` - Path to the checkpoint
/// * `architecture` - ResNet variant the checkpoint was trained with
/// * `device` - Device the weights are placed on
pub fn load_model(
    weights_path: impl AsRef<Path>,
    architecture: Architecture,
    device: &Device,
) -> Result<ResNet, InferenceError> {
    let path = weights_path.as_ref();
    if !path.is_file() {
        return Err(InferenceError::ModelNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let vb = match extension.as_str() {
        "pth" | "pt" | "bin" => VarBuilder::from_pth(path, DType::F32, device)?,
        // SAFETY: the file is not modified while the service runs.
        "safetensors" => unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)?
        },
        _ => {
            return Err(InferenceError::UnsupportedWeights(
                path.display().to_string(),
            ))
        }
    };

    let model = ResNet::new(architecture, vb)?;

    info!(
        path = %resolved_path(path).display(),
        architecture = architecture.name(),
        device = ?device,
        "Loaded model weights"
    );

    Ok(model)
}

/// Absolute form of `path` for logs; relative paths resolve against the
/// working directory. Falls back to `path` itself when it cannot be resolved.
pub fn resolved_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Startup sequence for the shared handle: device, weights, network.
pub fn load_classifier(config: &ModelConfig) -> Result<ModelHandle, InferenceError> {
    let device = select_device(config.device)?;
    let model = load_model(&config.path, config.architecture, &device)?;
    Ok(ModelHandle::new(model, device))
}
