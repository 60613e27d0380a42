//! Facegate embedding providers
//!
//! This crate turns a face image into a fixed-length embedding. The model
//! itself is opaque; what lives here is the plumbing around it:
//!
//! - decoding a base64 (or `data:` URI) payload into an in-memory image,
//! - the [`EmbeddingProvider`] seam every backend implements,
//! - the backends themselves:
//!   - **ONNX mode** - run an ArcFace-style model locally (`onnx` feature).
//!   - **API mode** - call a DeepFace-compatible `represent` endpoint.
//!   - **Stub mode** (`"fast"`) - deterministic vectors for tests and demos.
//!
//! If the ONNX model file is missing and `fallback_to_stub` is set, the stub is
//! used instead of failing start-up, and a warning is logged.
//!
//! ## Quick example
//!
//! ```no_run
//! use embed::{build_provider, decode_base64_image, EmbedConfig};
//!
//! # async fn run(payload: &str) -> Result<(), embed::EmbedError> {
//! let cfg = EmbedConfig { mode: "fast".into(), ..Default::default() };
//! let provider = build_provider(&cfg).await?;
//! let image = decode_base64_image(payload)?;
//! let embedding = provider.embed(&image).await?;
//! println!("{} dims from {}", embedding.dimensions, embedding.model_name);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod api;
mod assets;
mod decode;
mod normalize;
#[cfg(feature = "onnx")]
mod onnx;
mod preprocess;
mod provider;
mod stub;

pub use crate::api::ApiProvider;
pub use crate::config::EmbedConfig;
pub use crate::decode::{decode_base64_image, decode_base64_payload, strip_data_uri};
pub use crate::error::EmbedError;
#[cfg(feature = "onnx")]
pub use crate::onnx::OnnxProvider;
pub use crate::provider::EmbeddingProvider;
pub use crate::stub::StubProvider;
pub use crate::types::FaceEmbedding;

use std::sync::Arc;

use crate::assets::{ensure_model_file, should_fallback_to_stub};

/// Builds the provider selected by `cfg.mode`.
///
/// Called once at process start; the returned handle is shared read-only by
/// every request.
pub async fn build_provider(cfg: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbedError> {
    cfg.validate()?;

    match cfg.mode.as_str() {
        "fast" => Ok(Arc::new(StubProvider::new(cfg))),
        "api" => Ok(Arc::new(ApiProvider::new(cfg)?)),
        _ => build_onnx_provider(cfg).await,
    }
}

async fn build_onnx_provider(cfg: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbedError> {
    let model_path = match ensure_model_file(&cfg.model_path, cfg.model_url.as_deref()).await {
        Ok(path) => path,
        Err(err) if cfg.fallback_to_stub && should_fallback_to_stub(&err) => {
            tracing::warn!(error = %err, "face model unavailable, using stub embeddings");
            return Ok(Arc::new(StubProvider::new(cfg)));
        }
        Err(err) => return Err(err),
    };

    #[cfg(feature = "onnx")]
    {
        Ok(Arc::new(OnnxProvider::load(cfg, model_path).await?))
    }

    #[cfg(not(feature = "onnx"))]
    {
        if cfg.fallback_to_stub {
            tracing::warn!(
                path = %model_path.display(),
                "built without the `onnx` feature, using stub embeddings"
            );
            return Ok(Arc::new(StubProvider::new(cfg)));
        }
        Err(EmbedError::InvalidConfig(
            "onnx mode requires building with the `onnx` feature".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_mode_builds_stub() {
        let cfg = EmbedConfig {
            mode: "fast".into(),
            ..Default::default()
        };
        let provider = build_provider(&cfg).await.unwrap();
        assert_eq!(provider.backend(), "fast");
        assert_eq!(provider.model_name(), "ArcFace");
    }

    #[tokio::test]
    async fn missing_model_falls_back_to_stub() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EmbedConfig {
            mode: "onnx".into(),
            model_path: dir.path().join("missing.onnx"),
            fallback_to_stub: true,
            ..Default::default()
        };
        let provider = build_provider(&cfg).await.unwrap();
        assert_eq!(provider.backend(), "fast");
    }

    #[tokio::test]
    async fn missing_model_without_fallback_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EmbedConfig {
            mode: "onnx".into(),
            model_path: dir.path().join("missing.onnx"),
            fallback_to_stub: false,
            ..Default::default()
        };
        let err = build_provider(&cfg).await.err().unwrap();
        assert!(matches!(err, EmbedError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn api_mode_builds_api_provider() {
        let cfg = EmbedConfig {
            mode: "api".into(),
            api_url: Some("http://127.0.0.1:9/represent".into()),
            ..Default::default()
        };
        let provider = build_provider(&cfg).await.unwrap();
        assert_eq!(provider.backend(), "api");
    }
}
