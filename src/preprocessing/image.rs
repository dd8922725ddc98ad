use crate::error::InferenceError;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

/// Spatial size the network is trained on.
pub const INPUT_SIZE: u32 = 224;

/// Luma from RGB with ITU-R 601-2 weights in 16-bit fixed point, rounded.
/// Matches the grayscale conversion the training pipeline used.
fn luma(pixel: &Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    let weighted = u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471;
    ((weighted + 0x8000) >> 16) as u8
}

/// Turns an RGB image into the grayscale `[1, 1, 224, 224]` input tensor.
pub fn preprocess(rgb: &RgbImage) -> Result<Array4<f32>, InferenceError> {
    // 1. Resize (aspect ratio is not preserved)
    let resized = imageops::resize(rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    // 2. Grayscale & scale to [0, 1]
    let data: Vec<f32> = resized
        .pixels()
        .map(|pixel| f32::from(luma(pixel)) / 255.0)
        .collect();

    // Row-major pixels are already [H, W]; add batch and channel axes.
    let side = INPUT_SIZE as usize;
    let array = Array4::from_shape_vec((1, 1, side, side), data)?;

    Ok(array)
}

/// Preprocesses an encoded image (PNG, JPEG, ...) from raw bytes.
/// Returns a tensor of shape [1, 1, 224, 224].
pub fn process_bytes(buffer: &[u8]) -> Result<Array4<f32>, InferenceError> {
    // Grayscale, palette and alpha sources all go through RGB first.
    let img = image::load_from_memory(buffer)?;
    preprocess(&img.to_rgb8())
}
