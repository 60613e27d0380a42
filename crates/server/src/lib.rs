//! Facegate Server - HTTP REST API for face embedding, verification and
//! blink counting
//!
//! # Features
//!
//! - **Authentication**: optional API keys with per-key rate limiting
//! - **Middleware**: Compression, CORS, request ID tracking, structured logging
//! - **Configuration**: Environment variables, config file and pipeline YAML
//! - **Error Handling**: JSON error bodies with a `detail` string and error codes
//! - **Graceful Shutdown**: Proper signal handling for production deployments
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe with backend names
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Face Endpoints (API key required when keys are configured)
//!
//! - `POST /face/embedding` - Embed the face in a base64 image
//! - `POST /face/verify` - Verify a face against saved embeddings
//! - `POST /blink/count` - Count blinks in a multipart video upload

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
