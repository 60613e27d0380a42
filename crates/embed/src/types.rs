use serde::{Deserialize, Serialize};

/// Embedding output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaceEmbedding {
    /// Feature vector produced by the backend.
    pub vector: Vec<f32>,
    /// Name of the recognition model that produced the vector.
    pub model_name: String,
    /// Length of `vector`.
    pub dimensions: usize,
    /// Whether [`vector`](Self::vector) was L2-normalized.
    pub normalized: bool,
}

impl FaceEmbedding {
    pub fn new(vector: Vec<f32>, model_name: impl Into<String>, normalized: bool) -> Self {
        let dimensions = vector.len();
        Self {
            vector,
            model_name: model_name.into(),
            dimensions,
            normalized,
        }
    }
}
