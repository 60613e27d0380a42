use std::io;
use thiserror::Error;

/// Errors surfaced while decoding a clip or scoring its frames.
#[derive(Debug, Error)]
pub enum BlinkError {
    /// The payload is empty or could not be decoded into frames.
    #[error("invalid video data: {0}")]
    InvalidVideo(String),
    /// The external frame decoder (ffmpeg) could not be run.
    #[error("frame decoder unavailable: {0}")]
    Decoder(String),
    /// The blink model file is missing.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    /// Configuration is inconsistent.
    #[error("invalid blink config: {0}")]
    InvalidConfig(String),
    /// ONNX Runtime or tensor shaping errors.
    #[error("inference failure: {0}")]
    Inference(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl BlinkError {
    /// `true` for failures caused by the submitted clip rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, BlinkError::InvalidVideo(_))
    }
}
