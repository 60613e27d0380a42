//! Logging and Prometheus wiring.

use facegate::{FaceMetrics, PipelineError};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Handle of the process-wide Prometheus recorder, installed on first use.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .map_err(|e| tracing::warn!(error = %e, "could not install prometheus recorder"))
        .ok()
}

/// Structured JSON logs filtered by `log_level` (any `EnvFilter` directive).
pub fn init_tracing(log_level: &str) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .try_init();

    if let Err(err) = result {
        eprintln!("tracing subscriber already installed: {err}");
    }
}

/// Forwards pipeline stage timings to the `metrics` facade.
#[derive(Debug, Default)]
pub struct PrometheusFaceMetrics;

impl PrometheusFaceMetrics {
    fn record(stage: &'static str, latency: Duration, result: Result<(), &PipelineError>) {
        let outcome = match result {
            Ok(()) => "ok",
            Err(err) if err.is_client_error() => "rejected",
            Err(_) => "error",
        };
        metrics::counter!("facegate_stage_total", "stage" => stage, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("facegate_stage_duration_seconds", "stage" => stage)
            .record(latency.as_secs_f64());
    }
}

impl FaceMetrics for PrometheusFaceMetrics {
    fn record_embed(&self, latency: Duration, result: Result<(), &PipelineError>) {
        Self::record("embed", latency, result);
    }

    fn record_verify(&self, latency: Duration, result: Result<(), &PipelineError>) {
        Self::record("verify", latency, result);
    }

    fn record_blink(&self, latency: Duration, result: Result<(), &PipelineError>) {
        Self::record("blink", latency, result);
    }
}
