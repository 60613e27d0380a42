use async_trait::async_trait;
use image::DynamicImage;

use crate::{EmbedError, FaceEmbedding};

/// A backend that turns a face image into a fixed-length embedding.
///
/// Implementations are shared across requests behind an `Arc`, so they must
/// be read-only after construction.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model name reported alongside each embedding.
    fn model_name(&self) -> &str;

    /// Short backend label (`"onnx"`, `"api"`, `"fast"`) for logs and readiness.
    fn backend(&self) -> &'static str;

    /// Produce an embedding for the face in `image`.
    async fn embed(&self, image: &DynamicImage) -> Result<FaceEmbedding, EmbedError>;
}
