use facegate::{BlinkConfig, EmbedConfig, FacegateConfig, VerifyConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Rate limit: requests per minute per API key
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// API keys for the face routes. Empty leaves them open.
    #[serde(default)]
    pub api_keys: HashSet<String>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// YAML pipeline file; when set, its sections replace the inline ones.
    #[serde(default)]
    pub pipeline_config: Option<PathBuf>,

    #[serde(default)]
    pub embedding: EmbedConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub blink: BlinkConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashSet::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            pipeline_config: None,
            embedding: EmbedConfig::default(),
            verify: VerifyConfig::default(),
            blink: BlinkConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.*` file and
    /// `FACEGATE_SERVER__*` environment variables, in that order of precedence.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix("FACEGATE_SERVER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api_keys")
                    .try_parsing(true),
            );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        config.apply_pipeline_file()?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the inline pipeline sections with the ones from `pipeline_config`.
    pub fn apply_pipeline_file(&mut self) -> anyhow::Result<()> {
        if let Some(path) = &self.pipeline_config {
            let pipeline = FacegateConfig::from_file(path)?;
            tracing::info!(path = %path.display(), name = ?pipeline.name, "pipeline config loaded");
            self.embedding = pipeline.embedding;
            self.verify = pipeline.verify;
            self.blink = pipeline.blink;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be > 0");
        }
        if self.max_body_size_mb == 0 {
            anyhow::bail!("max_body_size_mb must be > 0");
        }
        self.embedding.validate()?;
        self.verify.validate()?;
        self.blink.validate()?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_body_size_mb() -> usize {
    25
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.timeout_secs, 60);
        assert_eq!(cfg.max_body_size(), 25 * 1024 * 1024);
        assert_eq!(cfg.rate_limit_per_minute, 100);
        assert!(cfg.enable_cors);
        assert!(cfg.metrics_enabled);
        assert!(!cfg.auth_enabled());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_pipeline_file_overrides_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"version: \"1.0\"\nembedding:\n  mode: \"fast\"\nverify:\n  threshold: 0.3\n")
            .unwrap();

        let mut cfg = ServerConfig {
            pipeline_config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        cfg.apply_pipeline_file().unwrap();
        assert_eq!(cfg.embedding.mode, "fast");
        assert_eq!(cfg.verify.effective_threshold(), 0.3);
    }

    #[test]
    fn test_invalid_inline_section_rejected() {
        let mut cfg = ServerConfig::default();
        cfg.embedding.mode = "gpu".into();
        assert!(cfg.validate().is_err());
    }
}
