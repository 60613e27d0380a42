use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::BlinkError;

/// Largest accepted `frame_size`; frames are square.
pub const MAX_FRAME_SIZE: u32 = 512;

/// How per-frame scores are turned into a count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingMode {
    /// Every frame whose score exceeds `threshold` counts once.
    #[default]
    Frames,
    /// A blink is one closed-then-reopened transition with hysteresis.
    Events,
}

/// Frame extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frames are resized to `frame_size x frame_size` before scoring.
    pub frame_size: u32,
    /// Frames past this index are ignored.
    pub max_frames: usize,
    /// Executable used for containers the image decoders cannot read.
    pub ffmpeg_path: String,
    pub decode_timeout_secs: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_size: 64,
            max_frames: 900,
            ffmpeg_path: "ffmpeg".into(),
            decode_timeout_secs: 60,
        }
    }
}

/// Blink classifier and counting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// `"onnx"` runs the sequence model; `"fast"` uses the luminance stub.
    pub mode: String,
    pub model_path: PathBuf,
    /// Channel order the model was trained on, `"bgr"` or `"rgb"`.
    pub channel_order: String,
    pub counting: CountingMode,
    /// Score above which a frame is considered "eyes closed".
    pub threshold: f32,
    /// In events mode, score below which closed eyes count as reopened.
    pub reopen_threshold: f32,
    /// Use the stub when the model file is missing instead of failing.
    pub fallback_to_stub: bool,
    pub frames: FrameConfig,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            mode: "onnx".into(),
            model_path: PathBuf::from("./models/blink/blink_lstm.onnx"),
            channel_order: "bgr".into(),
            counting: CountingMode::Frames,
            threshold: 0.5,
            reopen_threshold: 0.4,
            fallback_to_stub: true,
            frames: FrameConfig::default(),
        }
    }
}

impl BlinkConfig {
    pub fn validate(&self) -> Result<(), BlinkError> {
        if !matches!(self.mode.as_str(), "onnx" | "fast") {
            return Err(BlinkError::InvalidConfig(format!(
                "unknown blink mode '{}', expected 'onnx' or 'fast'",
                self.mode
            )));
        }
        if !matches!(self.channel_order.as_str(), "bgr" | "rgb") {
            return Err(BlinkError::InvalidConfig(format!(
                "channel_order must be 'bgr' or 'rgb', got '{}'",
                self.channel_order
            )));
        }
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(BlinkError::InvalidConfig(
                "threshold must be within [0, 1]".into(),
            ));
        }
        if !self.reopen_threshold.is_finite()
            || self.reopen_threshold < 0.0
            || self.reopen_threshold > self.threshold
        {
            return Err(BlinkError::InvalidConfig(
                "reopen_threshold must be within [0, threshold]".into(),
            ));
        }
        if self.frames.frame_size == 0 || self.frames.frame_size > MAX_FRAME_SIZE {
            return Err(BlinkError::InvalidConfig(format!(
                "frame_size must be within 1..={MAX_FRAME_SIZE}"
            )));
        }
        if self.frames.max_frames == 0 {
            return Err(BlinkError::InvalidConfig("max_frames must be > 0".into()));
        }
        Ok(())
    }
}
