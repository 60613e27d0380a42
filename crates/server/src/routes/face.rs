use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use facegate::VerificationOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Request carrying a face image
#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
    /// Base64 image, optionally a `data:image/...;base64,` URI
    #[serde(default)]
    pub image: Option<String>,
}

/// Response with the face embedding
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}

/// Stored embeddings to verify against.
///
/// Either a map of label to vector, or a single bare vector (reported under
/// the label `"saved"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SavedEmbeddings {
    Labeled(HashMap<String, Vec<f32>>),
    Single(Vec<f32>),
}

impl SavedEmbeddings {
    pub fn into_map(self) -> HashMap<String, Vec<f32>> {
        match self {
            SavedEmbeddings::Labeled(map) => map,
            SavedEmbeddings::Single(vector) => HashMap::from([("saved".to_string(), vector)]),
        }
    }
}

/// Request to verify a live face against stored embeddings
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub saved_embeddings: Option<SavedEmbeddings>,
}

fn require_image(image: Option<String>) -> ServerResult<String> {
    match image {
        Some(image) if !image.trim().is_empty() => Ok(image),
        _ => Err(ServerError::BadRequest("image is required".to_string())),
    }
}

/// Embed the face in a base64 image.
///
/// # Example
/// ```json
/// // Request
/// { "image": "data:image/jpeg;base64,/9j/4AAQ..." }
///
/// // Response
/// { "embedding": [0.12, -0.03, ...], "model": "ArcFace", "dimensions": 512 }
/// ```
pub async fn create_embedding(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> ServerResult<Json<EmbeddingResponse>> {
    let Json(request) = payload?;
    let image = require_image(request.image)?;

    let embedding = facegate::embed_face(state.embedder.as_ref(), &image).await?;

    Ok(Json(EmbeddingResponse {
        dimensions: embedding.dimensions,
        model: embedding.model_name,
        embedding: embedding.vector,
    }))
}

/// Verify a live face against one or more saved embeddings.
///
/// `saved_embeddings` is checked before the image is touched; a request
/// without it is rejected with 400 and no model call.
///
/// # Example
/// ```json
/// // Request
/// { "image": "<base64>", "saved_embeddings": { "front": [0.1, ...] } }
///
/// // Response
/// {
///   "is_verified": true,
///   "results": {
///     "front": { "verified": true, "distance": 0.2143, "threshold": 0.6, "metric": "cosine" }
///   }
/// }
/// ```
pub async fn verify_face(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ServerResult<Json<VerificationOutcome>> {
    let Json(request) = payload?;

    let saved = request
        .saved_embeddings
        .map(SavedEmbeddings::into_map)
        .filter(|saved| !saved.is_empty())
        .ok_or_else(|| ServerError::BadRequest("saved_embeddings is required".to_string()))?;
    let image = require_image(request.image)?;

    let outcome = facegate::verify_face(
        state.embedder.as_ref(),
        &image,
        &saved,
        &state.config.verify,
    )
    .await?;

    tracing::info!(
        labels = saved.len(),
        is_verified = outcome.is_verified,
        "face verified"
    );
    Ok(Json(outcome))
}
