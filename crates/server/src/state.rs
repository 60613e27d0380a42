use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use dashmap::DashMap;
use facegate::{BlinkClassifier, EmbeddingProvider};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, std::time::Instant)>>,

    /// Face embedding backend (shared across requests)
    pub embedder: Arc<dyn EmbeddingProvider>,

    /// Blink classifier backend (shared across requests)
    pub blink: Arc<dyn BlinkClassifier>,
}

impl ServerState {
    /// Create new server state, building the backends the config selects.
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let embedder = facegate::build_provider(&config.embedding)
            .await
            .map_err(|e| ServerError::Config(format!("embedding backend: {e}")))?;

        // Loading the ONNX blink model blocks.
        let blink_cfg = config.blink.clone();
        let blink = tokio::task::spawn_blocking(move || facegate::build_classifier(&blink_cfg))
            .await
            .map_err(|e| ServerError::Internal(format!("blink backend task failed: {e}")))?
            .map_err(|e| ServerError::Config(format!("blink backend: {e}")))?;

        tracing::info!(
            embedding = embedder.backend(),
            model = embedder.model_name(),
            blink = blink.backend(),
            "backends ready"
        );

        Ok(Self::with_backends(config, embedder, blink))
    }

    /// Create state around already-built backends.
    pub fn with_backends(
        config: ServerConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        blink: Arc<dyn BlinkClassifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            embedder,
            blink,
        }
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = std::time::Instant::now();
        let window = std::time::Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}

/// Server metadata for the info and readiness endpoints
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.embedding.mode = "fast".into();
        config.blink.mode = "fast".into();
        config
    }

    #[tokio::test]
    async fn builds_fast_backends() {
        let state = ServerState::new(fast_config()).await.unwrap();
        assert_eq!(state.embedder.backend(), "fast");
        assert_eq!(state.blink.backend(), "fast");
    }

    #[tokio::test]
    async fn rate_limit_applies_per_key() {
        let mut config = fast_config();
        config.api_keys.insert("k1".into());
        config.rate_limit_per_minute = 2;
        let state = ServerState::new(config).await.unwrap();

        assert!(state.is_valid_api_key("k1"));
        assert!(!state.is_valid_api_key("k2"));
        assert!(state.check_rate_limit("k1"));
        assert!(state.check_rate_limit("k1"));
        assert!(!state.check_rate_limit("k1"));
        assert!(state.check_rate_limit("k2"));
    }

    #[tokio::test]
    async fn misconfigured_backend_fails_startup() {
        let mut config = fast_config();
        config.embedding.mode = "api".into();
        config.embedding.api_url = None;
        assert!(matches!(
            ServerState::new(config).await,
            Err(ServerError::Config(_))
        ));
    }
}
