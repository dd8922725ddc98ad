//! ResNet backbone adapted for single-channel input and a single logit.
//!
//! Parameter names follow the torchvision layout (`conv1`, `bn1`,
//! `layer{1..4}.{i}.conv1`, `layer{n}.0.downsample.{0,1}`, `fc`) so a
//! `state_dict` saved from PyTorch loads without renaming.

use candle_core::{Module, Result, Tensor, D};
use candle_nn::{
    batch_norm, conv2d_no_bias, linear, BatchNorm, Conv2d, Conv2dConfig, Linear, VarBuilder,
};
use serde::Deserialize;

/// Grayscale input.
pub const IN_CHANNELS: usize = 1;
/// Single logit head.
pub const NUM_OUTPUTS: usize = 1;
/// Width of the pooled features feeding `fc` for BasicBlock networks.
pub const FC_IN_FEATURES: usize = 512;

const STEM_CHANNELS: usize = 64;
const BN_EPS: f64 = 1e-5;

#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    ResNet18,
    ResNet34,
}

impl Architecture {
    /// Number of residual blocks in each of the four stages.
    pub fn blocks_per_stage(self) -> [usize; 4] {
        match self {
            Architecture::ResNet18 => [2, 2, 2, 2],
            Architecture::ResNet34 => [3, 4, 6, 3],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Architecture::ResNet18 => "resnet18",
            Architecture::ResNet34 => "resnet34",
        }
    }
}

fn conv(
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    vb: VarBuilder,
) -> Result<Conv2d> {
    let config = Conv2dConfig {
        padding,
        stride,
        ..Default::default()
    };
    conv2d_no_bias(in_channels, out_channels, kernel, config, vb)
}

#[derive(Debug, Clone)]
struct Downsample {
    conv: Conv2d,
    bn: BatchNorm,
}

impl Downsample {
    fn new(in_channels: usize, out_channels: usize, stride: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            conv: conv(in_channels, out_channels, 1, stride, 0, vb.pp("0"))?,
            bn: batch_norm(out_channels, BN_EPS, vb.pp("1"))?,
        })
    }
}

impl Module for Downsample {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        xs.apply(&self.conv)?.apply_t(&self.bn, false)
    }
}

#[derive(Debug, Clone)]
struct BasicBlock {
    conv1: Conv2d,
    bn1: BatchNorm,
    conv2: Conv2d,
    bn2: BatchNorm,
    downsample: Option<Downsample>,
}

impl BasicBlock {
    fn new(in_channels: usize, out_channels: usize, stride: usize, vb: VarBuilder) -> Result<Self> {
        let downsample = if stride != 1 || in_channels != out_channels {
            Some(Downsample::new(
                in_channels,
                out_channels,
                stride,
                vb.pp("downsample"),
            )?)
        } else {
            None
        };

        Ok(Self {
            conv1: conv(in_channels, out_channels, 3, stride, 1, vb.pp("conv1"))?,
            bn1: batch_norm(out_channels, BN_EPS, vb.pp("bn1"))?,
            conv2: conv(out_channels, out_channels, 3, 1, 1, vb.pp("conv2"))?,
            bn2: batch_norm(out_channels, BN_EPS, vb.pp("bn2"))?,
            downsample,
        })
    }
}

impl Module for BasicBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let residual = match &self.downsample {
            Some(downsample) => xs.apply(downsample)?,
            None => xs.clone(),
        };
        let ys = xs
            .apply(&self.conv1)?
            .apply_t(&self.bn1, false)?
            .relu()?
            .apply(&self.conv2)?
            .apply_t(&self.bn2, false)?;
        (ys + residual)?.relu()
    }
}

/// Evaluation-only ResNet: batch norm always uses its running statistics.
#[derive(Debug, Clone)]
pub struct ResNet {
    architecture: Architecture,
    conv1: Conv2d,
    bn1: BatchNorm,
    stages: Vec<Vec<BasicBlock>>,
    fc: Linear,
}

impl ResNet {
    /// Builds the network, pulling every parameter from `vb`.
    ///
    /// Fails as soon as a tensor is missing or has the wrong shape.
    pub fn new(architecture: Architecture, vb: VarBuilder) -> Result<Self> {
        let conv1 = conv(IN_CHANNELS, STEM_CHANNELS, 7, 2, 3, vb.pp("conv1"))?;
        let bn1 = batch_norm(STEM_CHANNELS, BN_EPS, vb.pp("bn1"))?;

        let mut stages = Vec::with_capacity(4);
        let mut in_channels = STEM_CHANNELS;
        for (index, &blocks) in architecture.blocks_per_stage().iter().enumerate() {
            let out_channels = STEM_CHANNELS << index;
            let first_stride = if index == 0 { 1 } else { 2 };
            let stage_vb = vb.pp(format!("layer{}", index + 1));

            let mut stage = Vec::with_capacity(blocks);
            for block in 0..blocks {
                let stride = if block == 0 { first_stride } else { 1 };
                stage.push(BasicBlock::new(
                    in_channels,
                    out_channels,
                    stride,
                    stage_vb.pp(block.to_string()),
                )?);
                in_channels = out_channels;
            }
            stages.push(stage);
        }

        let fc = linear(FC_IN_FEATURES, NUM_OUTPUTS, vb.pp("fc"))?;

        Ok(Self {
            architecture,
            conv1,
            bn1,
            stages,
            fc,
        })
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }
}

impl Module for ResNet {
    /// `[batch, 1, H, W]` in, `[batch, 1]` logits out.
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = xs.apply(&self.conv1)?.apply_t(&self.bn1, false)?.relu()?;
        // 3x3/2 max pool with padding 1. Edge replication is equivalent to
        // -inf padding here since the window always contains a real pixel.
        let mut xs = xs
            .pad_with_same(D::Minus1, 1, 1)?
            .pad_with_same(D::Minus2, 1, 1)?
            .max_pool2d_with_stride(3, 2)?;

        for stage in &self.stages {
            for block in stage {
                xs = xs.apply(block)?;
            }
        }

        // Global average pool then flatten to [batch, 512].
        xs.mean(D::Minus1)?.mean(D::Minus1)?.apply(&self.fc)
    }
}
