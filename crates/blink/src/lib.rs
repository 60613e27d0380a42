//! Facegate blink counting
//!
//! A clip goes through three stages:
//!
//! 1. [`decode_frames`] turns the upload into `frame_size x frame_size` RGB
//!    frames (in-process for GIF/WebP/APNG, ffmpeg for real video containers).
//! 2. A [`BlinkClassifier`] scores each frame; the ONNX backend runs the
//!    sequence model (`onnx` feature), the `"fast"` stub uses relative
//!    luminance.
//! 3. [`count_blinks`] reduces the scores to a count, either one per closed
//!    frame or one per close-then-reopen event.
//!
//! ```no_run
//! use blink::{build_classifier, count_blinks, decode_frames, BlinkConfig};
//!
//! # async fn run(clip: Vec<u8>) -> Result<u32, blink::BlinkError> {
//! let cfg = BlinkConfig { mode: "fast".into(), ..Default::default() };
//! let classifier = build_classifier(&cfg)?;
//! let frames = decode_frames(clip, &cfg.frames).await?;
//! let scores = classifier.score_frames(&frames)?;
//! Ok(count_blinks(&scores, &cfg))
//! # }
//! ```

pub mod config;
pub mod error;

mod classifier;
mod count;
mod frames;
#[cfg(feature = "onnx")]
mod onnx;

pub use crate::classifier::{BlinkClassifier, StubClassifier};
pub use crate::config::{BlinkConfig, CountingMode, FrameConfig, MAX_FRAME_SIZE};
pub use crate::count::count_blinks;
pub use crate::error::BlinkError;
pub use crate::frames::{decode_frames, parse_raw_frames, Frame};
#[cfg(feature = "onnx")]
pub use crate::onnx::OnnxClassifier;

use std::sync::Arc;

/// Builds the classifier selected by `cfg.mode`.
///
/// Loading the ONNX model blocks; call this once at start-up.
pub fn build_classifier(cfg: &BlinkConfig) -> Result<Arc<dyn BlinkClassifier>, BlinkError> {
    cfg.validate()?;

    if cfg.mode == "fast" {
        return Ok(Arc::new(StubClassifier));
    }

    if !cfg.model_path.exists() {
        if cfg.fallback_to_stub {
            tracing::warn!(
                path = %cfg.model_path.display(),
                "blink model not found, using stub classifier"
            );
            return Ok(Arc::new(StubClassifier));
        }
        return Err(BlinkError::ModelNotFound(
            cfg.model_path.display().to_string(),
        ));
    }

    #[cfg(feature = "onnx")]
    {
        let bgr = cfg.channel_order == "bgr";
        Ok(Arc::new(OnnxClassifier::load(cfg.model_path.clone(), bgr)?))
    }

    #[cfg(not(feature = "onnx"))]
    {
        if cfg.fallback_to_stub {
            tracing::warn!("built without the `onnx` feature, using stub blink classifier");
            return Ok(Arc::new(StubClassifier));
        }
        Err(BlinkError::InvalidConfig(
            "onnx mode requires building with the `onnx` feature".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_mode_builds_stub() {
        let cfg = BlinkConfig {
            mode: "fast".into(),
            ..Default::default()
        };
        assert_eq!(build_classifier(&cfg).unwrap().backend(), "fast");
    }

    #[test]
    fn missing_model_falls_back() {
        let cfg = BlinkConfig {
            model_path: "/nonexistent/blink.onnx".into(),
            ..Default::default()
        };
        assert_eq!(build_classifier(&cfg).unwrap().backend(), "fast");
    }

    #[test]
    fn missing_model_without_fallback_fails() {
        let cfg = BlinkConfig {
            model_path: "/nonexistent/blink.onnx".into(),
            fallback_to_stub: false,
            ..Default::default()
        };
        assert!(matches!(
            build_classifier(&cfg).err().unwrap(),
            BlinkError::ModelNotFound(_)
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_loading() {
        let cfg = BlinkConfig {
            mode: "keras".into(),
            ..Default::default()
        };
        assert!(matches!(
            build_classifier(&cfg).err().unwrap(),
            BlinkError::InvalidConfig(_)
        ));
    }
}
