use crate::{BlinkError, Frame};

/// Scores a frame sequence; higher means "eyes closed".
///
/// Scoring is CPU-bound and synchronous. Callers run it on a blocking thread.
pub trait BlinkClassifier: Send + Sync {
    fn backend(&self) -> &'static str;

    /// One score in `[0, 1]` per model output element, usually one per frame.
    fn score_frames(&self, frames: &[Frame]) -> Result<Vec<f32>, BlinkError>;
}

/// Model-free classifier used for tests and demos.
///
/// A frame scores `1 - luminance / brightest_luminance` within its clip, so
/// frames markedly darker than the rest of the clip read as closed eyes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubClassifier;

impl BlinkClassifier for StubClassifier {
    fn backend(&self) -> &'static str {
        "fast"
    }

    fn score_frames(&self, frames: &[Frame]) -> Result<Vec<f32>, BlinkError> {
        let levels: Vec<f32> = frames.iter().map(mean_luminance).collect();
        let brightest = levels.iter().copied().fold(0.0f32, f32::max);
        if brightest <= f32::EPSILON {
            return Ok(vec![0.0; levels.len()]);
        }
        Ok(levels
            .into_iter()
            .map(|level| (1.0 - level / brightest).clamp(0.0, 1.0))
            .collect())
    }
}

fn mean_luminance(frame: &Frame) -> f32 {
    let pixels = (frame.width() as usize) * (frame.height() as usize);
    if pixels == 0 {
        return 0.0;
    }
    let sum: f32 = frame
        .pixels()
        .map(|p| 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32)
        .sum();
    sum / (pixels as f32 * 255.0)
}

/// Packs frames into a `[T, H, W, 3]` buffer scaled to `[0, 1]`.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub(crate) fn frames_tensor(frames: &[Frame], bgr: bool) -> Vec<f32> {
    let per_frame = frames
        .first()
        .map(|f| f.width() as usize * f.height() as usize * 3)
        .unwrap_or(0);
    let mut out = Vec::with_capacity(per_frame * frames.len());
    for frame in frames {
        for pixel in frame.pixels() {
            let [r, g, b] = pixel.0;
            let ordered = if bgr { [b, g, r] } else { [r, g, b] };
            out.extend(ordered.iter().map(|&c| c as f32 / 255.0));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame(level: u8) -> Frame {
        RgbImage::from_pixel(4, 4, Rgb([level, level, level]))
    }

    #[test]
    fn stub_scores_dark_frames_high() {
        let frames = vec![frame(240), frame(30), frame(240)];
        let scores = StubClassifier.score_frames(&frames).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores[0] < 0.01);
        assert!(scores[1] > 0.8);
        assert!(scores[2] < 0.01);
    }

    #[test]
    fn stub_handles_black_and_empty_clips() {
        assert!(StubClassifier.score_frames(&[]).unwrap().is_empty());
        let scores = StubClassifier.score_frames(&[frame(0), frame(0)]).unwrap();
        assert_eq!(scores, vec![0.0, 0.0]);
    }

    #[test]
    fn tensor_is_scaled_and_reordered() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 0, 51]));
        let bgr = frames_tensor(&[img.clone()], true);
        assert_eq!(bgr, vec![0.2, 0.0, 1.0]);
        let rgb = frames_tensor(&[img], false);
        assert_eq!(rgb, vec![1.0, 0.0, 0.2]);
    }

    #[test]
    fn tensor_length_covers_every_frame() {
        let frames = vec![frame(1), frame(2), frame(3)];
        assert_eq!(frames_tensor(&frames, true).len(), 3 * 4 * 4 * 3);
    }
}
