use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde_json::{json, Value};
use std::io::Cursor;
use std::time::Duration;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedConfig, EmbedError, EmbeddingProvider, FaceEmbedding};

/// Calls a remote representation service (DeepFace-compatible `represent`
/// endpoint) to embed a face. The remote side runs detection and alignment.
#[derive(Debug, Clone)]
pub struct ApiProvider {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
    model_name: String,
    detector_backend: String,
    normalize: bool,
}

impl ApiProvider {
    pub fn new(cfg: &EmbedConfig) -> Result<Self, EmbedError> {
        let url = cfg
            .api_url
            .clone()
            .ok_or_else(|| EmbedError::InvalidConfig("api_url is required for api mode".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.api_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EmbedError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            url,
            auth_header: cfg.api_auth_header.clone(),
            model_name: cfg.model_name.clone(),
            detector_backend: cfg.detector_backend.clone(),
            normalize: cfg.normalize,
        })
    }

    fn build_payload(&self, image: &DynamicImage) -> Result<Value, EmbedError> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| EmbedError::Inference(format!("png encode failed: {e}")))?;
        let encoded = STANDARD.encode(buf.into_inner());

        Ok(json!({
            "img": format!("data:image/png;base64,{encoded}"),
            "model_name": self.model_name,
            "detector_backend": self.detector_backend,
            "enforce_detection": true,
            "align": true,
        }))
    }
}

#[async_trait]
impl EmbeddingProvider for ApiProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn backend(&self) -> &'static str {
        "api"
    }

    async fn embed(&self, image: &DynamicImage) -> Result<FaceEmbedding, EmbedError> {
        let payload = self.build_payload(image)?;

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(header) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbedError::Remote(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EmbedError::Remote(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_remote_failure(status.as_u16(), &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| EmbedError::Remote(format!("response is not JSON: {e}")))?;
        let mut vector = parse_embedding(&value)?;
        if self.normalize {
            l2_normalize_in_place(&mut vector);
        }

        tracing::debug!(dimensions = vector.len(), "remote embedding received");
        Ok(FaceEmbedding::new(
            vector,
            self.model_name.clone(),
            self.normalize,
        ))
    }
}

/// Maps a non-2xx answer onto an [`EmbedError`]. Detection failures are
/// surfaced as [`EmbedError::NoFaceDetected`] so callers can answer 400.
fn classify_remote_failure(status: u16, body: &str) -> EmbedError {
    let lowered = body.to_ascii_lowercase();
    if lowered.contains("face could not be detected") || lowered.contains("no face") {
        return EmbedError::NoFaceDetected;
    }
    EmbedError::Remote(format!("status {status}: {}", body.trim()))
}

/// Accepts the shapes representation services answer with:
/// `{"results": [{"embedding": [...]}]}`, `[{"embedding": [...]}]`,
/// `{"embedding": [...]}`, or a bare `[...]`.
pub(crate) fn parse_embedding(value: &Value) -> Result<Vec<f32>, EmbedError> {
    let candidate = match value {
        Value::Object(map) if map.contains_key("results") => {
            if map["results"].as_array().is_some_and(Vec::is_empty) {
                return Err(EmbedError::NoFaceDetected);
            }
            first_entry(&map["results"]).and_then(|entry| entry.get("embedding"))
        }
        Value::Object(map) => map.get("embedding"),
        Value::Array(items) if items.first().is_some_and(Value::is_object) => {
            first_entry(value).and_then(|entry| entry.get("embedding"))
        }
        Value::Array(_) => Some(value),
        _ => None,
    };

    let items = candidate
        .and_then(Value::as_array)
        .ok_or_else(|| EmbedError::Remote("response did not contain an embedding".into()))?;
    if items.is_empty() {
        return Err(EmbedError::NoFaceDetected);
    }

    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbedError::Remote("embedding contains non-numeric values".into()))
        })
        .collect()
}

fn first_entry(value: &Value) -> Option<&Value> {
    value.as_array().and_then(|items| items.first())
}
