use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::EmbedError;

/// Runtime configuration describing which backend produces face embeddings.
///
/// # Example
/// ```no_run
/// use embed::{build_provider, EmbedConfig};
///
/// # async fn run() -> Result<(), embed::EmbedError> {
/// let cfg = EmbedConfig {
///     mode: "api".into(),
///     api_url: Some("http://deepface:5000/represent".into()),
///     ..Default::default()
/// };
/// let provider = build_provider(&cfg).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedConfig {
    /// Backend selector: `"onnx"` (local), `"api"` (remote HTTP), or `"fast"` (stub).
    pub mode: String,
    /// Recognition model name, reported on every embedding and forwarded to `api` backends.
    pub model_name: String,
    /// Face detector the `api` backend should run before embedding.
    pub detector_backend: String,
    /// Local ONNX model path.
    pub model_path: PathBuf,
    /// Optional URL downloaded to [`model_path`](Self::model_path) when the file is missing.
    pub model_url: Option<String>,
    /// Square input side length expected by the model.
    pub input_size: u32,
    /// Subtracted from every 0-255 channel value before scaling.
    pub pixel_mean: f32,
    /// Multiplied into every centered channel value.
    pub pixel_scale: f32,
    /// L2-normalize the resulting vector.
    pub normalize: bool,
    /// Representation endpoint for `api` mode.
    pub api_url: Option<String>,
    /// Authorization header value for `api` mode (e.g. `"Bearer xxx"`).
    pub api_auth_header: Option<String>,
    /// Overall API timeout in seconds.
    pub api_timeout_secs: u64,
    /// Vector length produced by the `fast` stub.
    pub stub_dimensions: usize,
    /// Use the stub when the ONNX model is missing instead of failing start-up.
    pub fallback_to_stub: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            mode: "onnx".into(),
            model_name: "ArcFace".into(),
            detector_backend: "retinaface".into(),
            model_path: PathBuf::from("./models/arcface/arcface.onnx"),
            model_url: None,
            input_size: 112,
            pixel_mean: 127.5,
            pixel_scale: 1.0 / 128.0,
            normalize: false,
            api_url: None,
            api_auth_header: None,
            api_timeout_secs: 30,
            stub_dimensions: 512,
            fallback_to_stub: true,
        }
    }
}

impl EmbedConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), EmbedError> {
        match self.mode.as_str() {
            "onnx" | "fast" => {}
            "api" => {
                if self.api_url.as_deref().is_none_or(str::is_empty) {
                    return Err(EmbedError::InvalidConfig(
                        "api_url is required for api mode".into(),
                    ));
                }
            }
            other => {
                return Err(EmbedError::InvalidConfig(format!(
                    "unknown embedding mode '{other}'"
                )))
            }
        }
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        if self.input_size == 0 {
            return Err(EmbedError::InvalidConfig(
                "input_size must be greater than zero".into(),
            ));
        }
        if self.stub_dimensions == 0 {
            return Err(EmbedError::InvalidConfig(
                "stub_dimensions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = EmbedConfig::default();
        assert_eq!(cfg.mode, "onnx");
        assert_eq!(cfg.model_name, "ArcFace");
        assert_eq!(cfg.detector_backend, "retinaface");
        assert_eq!(cfg.input_size, 112);
        assert_eq!(cfg.stub_dimensions, 512);
        assert_eq!(cfg.api_timeout_secs, 30);
        assert!(cfg.fallback_to_stub);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn api_mode_requires_url() {
        let cfg = EmbedConfig {
            mode: "api".into(),
            ..Default::default()
        };
        let err = cfg.validate().expect_err("config should be invalid");
        assert!(err.to_string().contains("api_url"));

        let cfg = EmbedConfig {
            mode: "api".into(),
            api_url: Some("http://localhost:5000/represent".into()),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_mode_rejected() {
        let cfg = EmbedConfig {
            mode: "gpu-magic".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EmbedError::InvalidConfig(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: EmbedConfig = serde_json::from_str(r#"{"mode":"fast"}"#).unwrap();
        assert_eq!(cfg.mode, "fast");
        assert_eq!(cfg.model_name, "ArcFace");
        assert_eq!(cfg.stub_dimensions, 512);
    }
}
