//! Workspace umbrella crate for facegate.
//!
//! This crate stitches image decoding, embedding, verification and blink
//! counting into the request pipelines the HTTP server calls, so callers can
//! work with a base64 image or a video upload through a single entry point.

pub mod config;

pub use blink::{
    BlinkClassifier, BlinkConfig, BlinkError, CountingMode, Frame, FrameConfig, StubClassifier,
    build_classifier, count_blinks, decode_frames, parse_raw_frames,
};
pub use embed::{
    EmbedConfig, EmbedError, EmbeddingProvider, FaceEmbedding, StubProvider, build_provider,
    decode_base64_image,
};
pub use verify::{
    DistanceMetric, LabelResult, VerificationOutcome, VerificationResult, VerifyConfig,
    VerifyError, cosine_distance, is_match, verify_against_saved, verify_embeddings,
};

pub use crate::config::{ConfigLoadError, FacegateConfig};

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Errors that can occur while running a request through a pipeline.
#[derive(Debug)]
pub enum PipelineError {
    Embed(EmbedError),
    Verify(VerifyError),
    Blink(BlinkError),
    /// A blocking inference task panicked or was cancelled.
    Task(String),
}

impl PipelineError {
    /// `true` when the caller sent something unusable (bad image, no face,
    /// missing saved embeddings) rather than the service failing.
    pub fn is_client_error(&self) -> bool {
        match self {
            PipelineError::Embed(err) => err.is_client_error(),
            PipelineError::Verify(VerifyError::InvalidConfig(_)) => false,
            PipelineError::Verify(_) => true,
            PipelineError::Blink(err) => err.is_client_error(),
            PipelineError::Task(_) => false,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Inner messages are shown as-is; they are what API clients see.
        match self {
            PipelineError::Embed(err) => write!(f, "{err}"),
            PipelineError::Verify(err) => write!(f, "{err}"),
            PipelineError::Blink(err) => write!(f, "{err}"),
            PipelineError::Task(msg) => write!(f, "inference task failed: {msg}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Embed(err) => Some(err),
            PipelineError::Verify(err) => Some(err),
            PipelineError::Blink(err) => Some(err),
            PipelineError::Task(_) => None,
        }
    }
}

impl From<EmbedError> for PipelineError {
    fn from(value: EmbedError) -> Self {
        PipelineError::Embed(value)
    }
}

impl From<VerifyError> for PipelineError {
    fn from(value: VerifyError) -> Self {
        PipelineError::Verify(value)
    }
}

impl From<BlinkError> for PipelineError {
    fn from(value: BlinkError) -> Self {
        PipelineError::Blink(value)
    }
}

/// Metrics observer for pipeline stages.
pub trait FaceMetrics: Send + Sync {
    fn record_embed(&self, latency: Duration, result: Result<(), &PipelineError>);
    fn record_verify(&self, latency: Duration, result: Result<(), &PipelineError>);
    fn record_blink(&self, latency: Duration, result: Result<(), &PipelineError>);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_face_metrics(recorder: Option<Arc<dyn FaceMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn FaceMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn FaceMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn FaceMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn FaceMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_embed<T>(self, result: &Result<T, PipelineError>) {
        self.recorder
            .record_embed(self.start.elapsed(), outcome(result));
    }

    fn record_verify<T>(self, result: &Result<T, PipelineError>) {
        self.recorder
            .record_verify(self.start.elapsed(), outcome(result));
    }

    fn record_blink<T>(self, result: &Result<T, PipelineError>) {
        self.recorder
            .record_blink(self.start.elapsed(), outcome(result));
    }
}

fn outcome<T>(result: &Result<T, PipelineError>) -> Result<(), &PipelineError> {
    result.as_ref().map(|_| ())
}

/// Decode a base64 image and embed the face in it.
pub async fn embed_face(
    provider: &dyn EmbeddingProvider,
    image_b64: &str,
) -> Result<FaceEmbedding, PipelineError> {
    let span = MetricsSpan::start();
    let result = embed_payload(provider, image_b64).await;
    if let Some(span) = span {
        span.record_embed(&result);
    }
    result
}

async fn embed_payload(
    provider: &dyn EmbeddingProvider,
    image_b64: &str,
) -> Result<FaceEmbedding, PipelineError> {
    let image = decode_base64_image(image_b64)?;
    let embedding = provider.embed(&image).await?;
    tracing::debug!(
        dimensions = embedding.dimensions,
        backend = provider.backend(),
        "face embedded"
    );
    Ok(embedding)
}

/// Embed the face in `image_b64` and check it against every saved embedding.
///
/// An empty `saved` map is rejected before the image is decoded, so no model
/// call is made for a request that cannot be verified.
pub async fn verify_face(
    provider: &dyn EmbeddingProvider,
    image_b64: &str,
    saved: &HashMap<String, Vec<f32>>,
    cfg: &VerifyConfig,
) -> Result<VerificationOutcome, PipelineError> {
    let span = MetricsSpan::start();
    let result = verify_payload(provider, image_b64, saved, cfg).await;
    if let Some(span) = span {
        span.record_verify(&result);
    }
    result
}

async fn verify_payload(
    provider: &dyn EmbeddingProvider,
    image_b64: &str,
    saved: &HashMap<String, Vec<f32>>,
    cfg: &VerifyConfig,
) -> Result<VerificationOutcome, PipelineError> {
    if saved.is_empty() {
        return Err(VerifyError::NoSavedEmbeddings.into());
    }
    cfg.validate()?;

    let live = embed_payload(provider, image_b64).await?;
    let outcome = verify_against_saved(&live.vector, saved, cfg)?;
    tracing::debug!(
        labels = saved.len(),
        is_verified = outcome.is_verified,
        "verification finished"
    );
    Ok(outcome)
}

/// Decode a clip, score its frames and count blinks.
///
/// A clip with no frames counts zero blinks without invoking the classifier.
pub async fn count_blinks_in_video(
    classifier: Arc<dyn BlinkClassifier>,
    video: Vec<u8>,
    cfg: &BlinkConfig,
) -> Result<u32, PipelineError> {
    let span = MetricsSpan::start();
    let result = count_payload(classifier, video, cfg).await;
    if let Some(span) = span {
        span.record_blink(&result);
    }
    result
}

async fn count_payload(
    classifier: Arc<dyn BlinkClassifier>,
    video: Vec<u8>,
    cfg: &BlinkConfig,
) -> Result<u32, PipelineError> {
    let frames = decode_frames(video, &cfg.frames).await?;
    if frames.is_empty() {
        return Ok(0);
    }

    let frame_count = frames.len();
    let scores = tokio::task::spawn_blocking(move || classifier.score_frames(&frames))
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;

    let count = count_blinks(&scores, cfg);
    tracing::debug!(frames = frame_count, count, "blinks counted");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    fn fast_provider() -> StubProvider {
        StubProvider::new(&EmbedConfig {
            mode: "fast".into(),
            ..Default::default()
        })
    }

    fn png_b64(img: RgbImage) -> String {
        use base64::Engine;
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .expect("png encode");
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    }

    fn face_like(seed: u8) -> String {
        png_b64(RgbImage::from_fn(24, 24, |x, y| {
            Rgb([(x * 10) as u8, (y * 10) as u8, seed])
        }))
    }

    fn blink_gif(levels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut out);
            let frames = levels.iter().map(|&level| {
                let img = RgbaImage::from_pixel(16, 16, Rgba([level, level, level, 255]));
                image::Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(40, 1))
            });
            encoder.encode_frames(frames).expect("gif encode");
        }
        out
    }

    #[tokio::test]
    async fn embed_face_returns_vector() {
        let provider = fast_provider();
        let embedding = embed_face(&provider, &face_like(1))
            .await
            .expect("embedding should succeed");
        assert_eq!(embedding.dimensions, 512);
        assert_eq!(embedding.model_name, "ArcFace");
    }

    #[tokio::test]
    async fn embed_face_rejects_garbage() {
        let provider = fast_provider();
        let err = embed_face(&provider, "data:image/png;base64,@@@")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Embed(EmbedError::InvalidImage(_))));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn verify_face_matches_same_image() {
        let provider = fast_provider();
        let image = face_like(7);
        let stored = embed_face(&provider, &image).await.unwrap();

        let mut saved = HashMap::new();
        saved.insert("me".to_string(), stored.vector);
        saved.insert("other".to_string(), embed_face(&provider, &face_like(99)).await.unwrap().vector);

        let outcome = verify_face(&provider, &image, &saved, &VerifyConfig::default())
            .await
            .unwrap();
        assert!(outcome.is_verified);
        assert!(outcome.results["me"].is_verified());
        assert!(!outcome.results["other"].is_verified());
    }

    #[tokio::test]
    async fn verify_face_requires_saved_embeddings() {
        let provider = fast_provider();
        // Not even valid base64: the request must fail before decoding.
        let err = verify_face(&provider, "!!!", &HashMap::new(), &VerifyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Verify(VerifyError::NoSavedEmbeddings)
        ));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn verify_face_reports_no_face() {
        let provider = fast_provider();
        let blank = png_b64(RgbImage::from_pixel(8, 8, Rgb([30, 30, 30])));
        let mut saved = HashMap::new();
        saved.insert("me".to_string(), vec![1.0; 512]);

        let err = verify_face(&provider, &blank, &saved, &VerifyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Embed(EmbedError::NoFaceDetected)));
    }

    #[tokio::test]
    async fn count_blinks_in_gif_clip() {
        let cfg = BlinkConfig {
            mode: "fast".into(),
            ..Default::default()
        };
        let clip = blink_gif(&[240, 240, 20, 240, 240, 25, 240]);
        let count = count_blinks_in_video(Arc::new(StubClassifier), clip, &cfg)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn empty_clip_is_client_error() {
        let err = count_blinks_in_video(Arc::new(StubClassifier), Vec::new(), &BlinkConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[derive(Default)]
    struct RecordingMetrics {
        events: Mutex<Vec<(&'static str, bool)>>,
    }

    impl FaceMetrics for RecordingMetrics {
        fn record_embed(&self, _latency: Duration, result: Result<(), &PipelineError>) {
            self.events.lock().unwrap().push(("embed", result.is_ok()));
        }

        fn record_verify(&self, _latency: Duration, result: Result<(), &PipelineError>) {
            self.events.lock().unwrap().push(("verify", result.is_ok()));
        }

        fn record_blink(&self, _latency: Duration, result: Result<(), &PipelineError>) {
            self.events.lock().unwrap().push(("blink", result.is_ok()));
        }
    }

    #[tokio::test]
    async fn metrics_recorder_sees_each_stage() {
        let recorder = Arc::new(RecordingMetrics::default());
        set_face_metrics(Some(recorder.clone()));

        let provider = fast_provider();
        let _ = embed_face(&provider, &face_like(3)).await;
        let _ = verify_face(&provider, &face_like(3), &HashMap::new(), &VerifyConfig::default()).await;

        set_face_metrics(None);

        let events = recorder.events.lock().unwrap().clone();
        assert!(events.contains(&("embed", true)));
        assert!(events.contains(&("verify", false)));
    }
}
