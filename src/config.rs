use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::model::resnet::Architecture;

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on the request body, `None` accepts uploads of any size.
    pub max_upload_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_bytes: None,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ModelConfig {
    /// Checkpoint location. A relative path is resolved against the process
    /// working directory, not the binary or the config file.
    pub path: PathBuf,
    pub architecture: Architecture,
    pub device: DeviceKind,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model/bone_cancer_model.pth"),
            architecture: Architecture::ResNet18,
            device: DeviceKind::Cpu,
        }
    }
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "config.yaml";

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Reads the configuration file.
    ///
    /// An explicit path must exist. Without one, `config.yaml` in the working
    /// directory is used when present and the built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(Self::DEFAULT_PATH);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// Compute device the model is pinned to.
#[derive(Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(try_from = "String")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl FromStr for DeviceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let (kind, ordinal) = match normalized.split_once(':') {
            Some((kind, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidDevice(s.to_string()))?;
                (kind, ordinal)
            }
            None => (normalized.as_str(), 0),
        };

        match kind {
            "cpu" if !normalized.contains(':') => Ok(DeviceKind::Cpu),
            "cuda" => Ok(DeviceKind::Cuda(ordinal)),
            "metal" => Ok(DeviceKind::Metal(ordinal)),
            _ => Err(ConfigError::InvalidDevice(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeviceKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            DeviceKind::Metal(ordinal) => write!(f, "metal:{ordinal}"),
        }
    }
}
