use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Distance used to compare two embeddings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cosine similarity`.
    #[default]
    Cosine,
    /// Raw Euclidean distance.
    Euclidean,
    /// Euclidean distance between L2-normalized vectors.
    EuclideanL2,
}

impl DistanceMetric {
    /// Threshold applied when [`VerifyConfig::threshold`] is not set.
    ///
    /// Cosine uses the 0.60 cut-off the service has always run with; the
    /// Euclidean values are the ArcFace reference thresholds.
    pub fn default_threshold(self) -> f64 {
        match self {
            DistanceMetric::Cosine => 0.60,
            DistanceMetric::Euclidean => 4.15,
            DistanceMetric::EuclideanL2 => 1.13,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::EuclideanL2 => "euclidean_l2",
        }
    }
}

/// Configuration for the verification decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VerifyConfig {
    /// Distance metric.
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Match threshold. `None` uses [`DistanceMetric::default_threshold`].
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Decimal places kept on the reported distance.
    #[serde(default = "VerifyConfig::default_distance_decimals")]
    pub distance_decimals: u32,
}

impl VerifyConfig {
    pub(crate) fn default_distance_decimals() -> u32 {
        4
    }

    /// Threshold that will actually be applied.
    pub fn effective_threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.metric.default_threshold())
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), VerifyError> {
        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(VerifyError::InvalidConfig(
                    "threshold must be a finite value greater than zero".into(),
                ));
            }
        }
        if self.distance_decimals > 12 {
            return Err(VerifyError::InvalidConfig(
                "distance_decimals must be <= 12".into(),
            ));
        }
        Ok(())
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            threshold: None,
            distance_decimals: Self::default_distance_decimals(),
        }
    }
}

/// Outcome of comparing one live embedding with one stored embedding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VerificationResult {
    /// `true` when `distance < threshold`.
    pub verified: bool,
    /// Distance rounded to [`VerifyConfig::distance_decimals`].
    pub distance: f64,
    pub threshold: f64,
    pub metric: DistanceMetric,
}

/// Per-label entry in a [`VerificationOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LabelResult {
    Decision(VerificationResult),
    Failed { error: String },
}

impl LabelResult {
    pub fn is_verified(&self) -> bool {
        matches!(self, LabelResult::Decision(result) if result.verified)
    }
}

/// Result of checking a live embedding against every saved embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationOutcome {
    /// `true` when at least one saved embedding matched.
    pub is_verified: bool,
    /// Keyed by the label the caller stored the embedding under.
    pub results: BTreeMap<String, LabelResult>,
}

/// Errors surfaced by the verification decision.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VerifyError {
    #[error("embedding is empty")]
    EmptyEmbedding,
    #[error("embedding dimensions differ: live {live}, stored {stored}")]
    DimensionMismatch { live: usize, stored: usize },
    #[error("embedding contains NaN or infinite values")]
    NonFinite,
    #[error("cosine distance is undefined for a zero-length vector")]
    ZeroNorm,
    #[error("no saved embeddings were provided")]
    NoSavedEmbeddings,
    #[error("invalid verify config: {0}")]
    InvalidConfig(String),
}
