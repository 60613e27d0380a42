//! YAML pipeline configuration for facegate.
//!
//! One file describes every stage: the embedding backend, the verification
//! decision and the blink counter. Sections that are left out keep their
//! defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "kiosk"
//!
//! embedding:
//!   mode: "onnx"
//!   model_name: "ArcFace"
//!   model_path: "./models/arcface/arcface.onnx"
//!   input_size: 112
//!   fallback_to_stub: false
//!
//! verify:
//!   metric: "cosine"
//!   threshold: 0.60
//!   distance_decimals: 4
//!
//! blink:
//!   mode: "onnx"
//!   model_path: "./models/blink/blink_lstm.onnx"
//!   counting: "frames"
//!   threshold: 0.5
//!   frames:
//!     frame_size: 64
//!     max_frames: 900
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BlinkConfig, EmbedConfig, VerifyConfig};

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for every facegate pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FacegateConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub embedding: EmbedConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub blink: BlinkConfig,
}

impl FacegateConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FacegateConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.embedding
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("embedding: {e}")))?;
        self.verify
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("verify: {e}")))?;
        self.blink
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("blink: {e}")))?;
        Ok(())
    }
}

impl Default for FacegateConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            embedding: EmbedConfig::default(),
            verify: VerifyConfig::default(),
            blink: BlinkConfig::default(),
        }
    }
}
