use crate::error::{ServerError, ServerResult};
use crate::state::{ServerMetadata, ServerState};
use crate::telemetry;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness)
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness check endpoint
///
/// Backends are built before the listener binds, so a running server is ready;
/// the response names the backends that were selected.
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let metadata = ServerMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(),
    };

    Ok(Json(json!({
        "status": "ready",
        "service": "facegate-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "server": metadata,
        "components": {
            "embedding": {
                "backend": state.embedder.backend(),
                "model": state.embedder.model_name(),
            },
            "blink": {
                "backend": state.blink.backend(),
            },
            "auth": state.config.auth_enabled(),
        }
    })))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    if !state.config.metrics_enabled {
        return Err(ServerError::NotFound);
    }
    let handle = telemetry::prometheus_handle()
        .ok_or_else(|| ServerError::Internal("metrics recorder unavailable".into()))?;

    metrics::gauge!("facegate_uptime_seconds").set(uptime_seconds() as f64);

    Ok((
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
