use async_trait::async_trait;
use fxhash::hash64;
use image::DynamicImage;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedConfig, EmbedError, EmbeddingProvider, FaceEmbedding};

/// Deterministic provider used for `"fast"` mode or when model assets are unavailable.
///
/// Each dimension is seeded from a hash of the pixels so the same image always
/// produces the same vector, while different images land close to orthogonal. A uniform image (every pixel identical) is
/// treated as "no face", which gives tests a cheap way to exercise the
/// detection-failure path.
#[derive(Debug, Clone)]
pub struct StubProvider {
    model_name: String,
    dimensions: usize,
    normalize: bool,
}

impl StubProvider {
    pub fn new(cfg: &EmbedConfig) -> Self {
        Self {
            model_name: cfg.model_name.clone(),
            dimensions: cfg.stub_dimensions,
            normalize: cfg.normalize,
        }
    }

    pub(crate) fn embed_sync(&self, image: &DynamicImage) -> Result<FaceEmbedding, EmbedError> {
        let rgb = image.to_rgb8();
        let raw = rgb.as_raw();
        if raw.is_empty() || raw.chunks_exact(3).all(|px| px == &raw[..3]) {
            return Err(EmbedError::NoFaceDetected);
        }

        let seed = hash64(raw);
        let mut v = vec![0f32; self.dimensions];
        for (idx, value) in v.iter_mut().enumerate() {
            let bits = hash64(&(seed, idx as u64));
            *value = ((bits >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) as f32;
        }
        if self.normalize {
            l2_normalize_in_place(&mut v);
        }
        Ok(FaceEmbedding::new(v, self.model_name.clone(), self.normalize))
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn backend(&self) -> &'static str {
        "fast"
    }

    async fn embed(&self, image: &DynamicImage) -> Result<FaceEmbedding, EmbedError> {
        self.embed_sync(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(seed: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(16, 16, |x, y| {
            Rgb([x as u8 * 8, y as u8 * 8, seed])
        }))
    }

    fn stub(normalize: bool) -> StubProvider {
        StubProvider::new(&EmbedConfig {
            mode: "fast".into(),
            normalize,
            ..Default::default()
        })
    }

    #[test]
    fn stub_has_configured_dimensions() {
        let embedding = stub(false).embed_sync(&gradient(1)).unwrap();
        assert_eq!(embedding.dimensions, 512);
        assert_eq!(embedding.vector.len(), 512);
        assert_eq!(embedding.model_name, "ArcFace");
    }

    #[test]
    fn stub_is_deterministic() {
        let provider = stub(false);
        let a = provider.embed_sync(&gradient(9)).unwrap();
        let b = provider.embed_sync(&gradient(9)).unwrap();
        assert_eq!(a.vector, b.vector);
    }

    #[test]
    fn stub_differs_per_image() {
        let provider = stub(false);
        let a = provider.embed_sync(&gradient(1)).unwrap();
        let b = provider.embed_sync(&gradient(2)).unwrap();
        assert_ne!(a.vector, b.vector);
    }

    #[test]
    fn stub_normalizes_when_asked() {
        let embedding = stub(true).embed_sync(&gradient(3)).unwrap();
        let norm: f32 = embedding.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert!(embedding.normalized);
    }

    #[test]
    fn uniform_image_reports_no_face() {
        let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([200, 200, 200])));
        assert!(matches!(
            stub(false).embed_sync(&blank),
            Err(EmbedError::NoFaceDetected)
        ));
    }

    #[tokio::test]
    async fn async_embed_delegates() {
        let provider = stub(false);
        assert_eq!(provider.backend(), "fast");
        let embedding = provider.embed(&gradient(4)).await.unwrap();
        assert_eq!(embedding.dimensions, 512);
    }
}
