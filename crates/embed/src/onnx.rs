use async_trait::async_trait;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use onnxruntime::environment::Environment;
use onnxruntime::ndarray::Array;
use onnxruntime::session::Session;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::normalize::l2_normalize_in_place;
use crate::preprocess::face_tensor;
use crate::{EmbedConfig, EmbedError, EmbeddingProvider, FaceEmbedding};

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

thread_local! {
    static SESSION_CACHE: RefCell<HashMap<PathBuf, Rc<RefCell<Session<'static>>>>> =
        RefCell::new(HashMap::new());
}

/// Local ONNX face-recognition model (ArcFace-style, NCHW input, one
/// embedding output).
///
/// Sessions are not `Send`, so inference runs on tokio's blocking pool and each
/// pool thread keeps its own session, loaded on first use.
#[derive(Debug, Clone)]
pub struct OnnxProvider {
    model_path: PathBuf,
    model_name: String,
    input_size: u32,
    pixel_mean: f32,
    pixel_scale: f32,
    normalize: bool,
}

impl OnnxProvider {
    /// Builds the provider and loads the model once to surface a broken file at start-up.
    pub async fn load(cfg: &EmbedConfig, model_path: PathBuf) -> Result<Self, EmbedError> {
        let provider = Self {
            model_path,
            model_name: cfg.model_name.clone(),
            input_size: cfg.input_size,
            pixel_mean: cfg.pixel_mean,
            pixel_scale: cfg.pixel_scale,
            normalize: cfg.normalize,
        };

        let path = provider.model_path.clone();
        tokio::task::spawn_blocking(move || with_session(&path, |_| Ok(())))
            .await
            .map_err(|e| EmbedError::Inference(format!("model warm-up task failed: {e}")))??;

        tracing::info!(path = %provider.model_path.display(), "onnx face model loaded");
        Ok(provider)
    }

    fn embed_blocking(&self, image: &DynamicImage) -> Result<FaceEmbedding, EmbedError> {
        let size = self.input_size as usize;
        let data = face_tensor(image, self.input_size, self.pixel_mean, self.pixel_scale);
        let input = Array::from_shape_vec((1, 3, size, size), data)
            .map_err(|e| EmbedError::Inference(e.to_string()))?;

        let mut vector = with_session(&self.model_path, |session| {
            let outputs = session
                .run::<f32, f32, _>(vec![input.into_dyn()])
                .map_err(|e| EmbedError::Inference(e.to_string()))?;
            let output = outputs
                .into_iter()
                .next()
                .ok_or_else(|| EmbedError::Inference("model returned no outputs".into()))?;
            Ok(output.iter().copied().collect::<Vec<f32>>())
        })?;

        if vector.is_empty() {
            return Err(EmbedError::Inference("model returned an empty embedding".into()));
        }
        if self.normalize {
            l2_normalize_in_place(&mut vector);
        }
        Ok(FaceEmbedding::new(vector, self.model_name.clone(), self.normalize))
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }

    async fn embed(&self, image: &DynamicImage) -> Result<FaceEmbedding, EmbedError> {
        let provider = self.clone();
        let image = image.clone();
        tokio::task::spawn_blocking(move || provider.embed_blocking(&image))
            .await
            .map_err(|e| EmbedError::Inference(format!("inference task failed: {e}")))?
    }
}

fn with_session<R>(
    path: &Path,
    f: impl FnOnce(&mut Session<'static>) -> Result<R, EmbedError>,
) -> Result<R, EmbedError> {
    let handle = SESSION_CACHE.with(|cache| -> Result<_, EmbedError> {
        let mut cache = cache.borrow_mut();
        if let Some(handle) = cache.get(path) {
            return Ok(handle.clone());
        }

        let handle = Rc::new(RefCell::new(load_session(path)?));
        cache.insert(path.to_path_buf(), handle.clone());
        Ok(handle)
    })?;

    let mut guard = handle.borrow_mut();
    f(&mut guard)
}

fn load_session(path: &Path) -> Result<Session<'static>, EmbedError> {
    ort_environment()?
        .new_session_builder()
        .map_err(|e| EmbedError::Inference(e.to_string()))?
        .with_model_from_file(path.to_path_buf())
        .map_err(|e| EmbedError::Inference(e.to_string()))
}

fn ort_environment() -> Result<&'static Environment, EmbedError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("facegate-embed")
            .build()
            .map_err(|e| EmbedError::Inference(e.to_string()))
    })
}
