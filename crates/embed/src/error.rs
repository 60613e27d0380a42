use std::io;
use thiserror::Error;

/// Errors surfaced while turning an image payload into an embedding.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The payload was empty, not base64, or not a decodable image.
    #[error("invalid image data: {0}")]
    InvalidImage(String),
    /// The backend found no face to embed.
    #[error("face could not be detected in the image")]
    NoFaceDetected,
    /// The ONNX model could not be located locally and no download URL was provided.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    /// Configuration is inconsistent (e.g. `api` mode without `api_url`).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
    /// Unable to download remote model assets.
    #[error("download failed: {0}")]
    Download(String),
    /// The remote representation service failed or answered with garbage.
    #[error("remote embedding service error: {0}")]
    Remote(String),
    /// ONNX Runtime or pre/post-processing errors.
    #[error("inference failure: {0}")]
    Inference(String),
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl EmbedError {
    /// `true` for failures caused by the submitted image rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, EmbedError::InvalidImage(_) | EmbedError::NoFaceDetected)
    }
}
