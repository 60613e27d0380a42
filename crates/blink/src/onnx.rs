use once_cell::sync::OnceCell;
use onnxruntime::environment::Environment;
use onnxruntime::ndarray::Array;
use onnxruntime::session::Session;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::classifier::frames_tensor;
use crate::{BlinkClassifier, BlinkError, Frame};

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

thread_local! {
    static SESSION_CACHE: RefCell<HashMap<PathBuf, Rc<RefCell<Session<'static>>>>> =
        RefCell::new(HashMap::new());
}

/// Sequence model taking `[1, T, H, W, 3]` frames scaled to `[0, 1]` and
/// returning closed-eye probabilities.
#[derive(Debug, Clone)]
pub struct OnnxClassifier {
    model_path: PathBuf,
    bgr: bool,
}

impl OnnxClassifier {
    /// Loads the model once on the calling thread to surface a broken file early.
    pub fn load(model_path: PathBuf, bgr: bool) -> Result<Self, BlinkError> {
        with_session(&model_path, |_| Ok(()))?;
        tracing::info!(path = %model_path.display(), "onnx blink model loaded");
        Ok(Self { model_path, bgr })
    }
}

impl BlinkClassifier for OnnxClassifier {
    fn backend(&self) -> &'static str {
        "onnx"
    }

    fn score_frames(&self, frames: &[Frame]) -> Result<Vec<f32>, BlinkError> {
        let Some(first) = frames.first() else {
            return Ok(Vec::new());
        };
        let (w, h) = first.dimensions();
        if frames.iter().any(|f| f.dimensions() != (w, h)) {
            return Err(BlinkError::Inference("frames differ in size".into()));
        }

        let data = frames_tensor(frames, self.bgr);
        let input = Array::from_shape_vec((1, frames.len(), h as usize, w as usize, 3), data)
            .map_err(|e| BlinkError::Inference(e.to_string()))?;

        with_session(&self.model_path, |session| {
            let outputs = session
                .run::<f32, f32, _>(vec![input.into_dyn()])
                .map_err(|e| BlinkError::Inference(e.to_string()))?;
            let output = outputs
                .into_iter()
                .next()
                .ok_or_else(|| BlinkError::Inference("model returned no outputs".into()))?;
            Ok(output.iter().copied().collect())
        })
    }
}

fn with_session<R>(
    path: &Path,
    f: impl FnOnce(&mut Session<'static>) -> Result<R, BlinkError>,
) -> Result<R, BlinkError> {
    let handle = SESSION_CACHE.with(|cache| -> Result<_, BlinkError> {
        let mut cache = cache.borrow_mut();
        if let Some(handle) = cache.get(path) {
            return Ok(handle.clone());
        }
        let session = ort_environment()?
            .new_session_builder()
            .map_err(|e| BlinkError::Inference(e.to_string()))?
            .with_model_from_file(path.to_path_buf())
            .map_err(|e| BlinkError::Inference(e.to_string()))?;
        let handle = Rc::new(RefCell::new(session));
        cache.insert(path.to_path_buf(), handle.clone());
        Ok(handle)
    })?;

    let mut guard = handle.borrow_mut();
    f(&mut guard)
}

fn ort_environment() -> Result<&'static Environment, BlinkError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("facegate-blink")
            .build()
            .map_err(|e| BlinkError::Inference(e.to_string()))
    })
}
