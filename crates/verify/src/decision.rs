use std::collections::{BTreeMap, HashMap};

use crate::distance::distance;
use crate::types::{
    LabelResult, VerificationOutcome, VerificationResult, VerifyConfig, VerifyError,
};

/// Strict threshold test: a distance equal to the threshold is not a match.
#[inline]
pub fn is_match(distance: f64, threshold: f64) -> bool {
    distance < threshold
}

/// Rounds `value` to `decimals` places, half away from zero.
pub fn round_distance(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Compares a freshly computed embedding with a stored one.
///
/// The decision is taken on the unrounded distance, and a result whose reported
/// (rounded) distance reaches the threshold is never reported as verified.
pub fn verify_embeddings(
    live: &[f32],
    stored: &[f32],
    cfg: &VerifyConfig,
) -> Result<VerificationResult, VerifyError> {
    cfg.validate()?;
    let threshold = cfg.effective_threshold();
    let raw = distance(cfg.metric, live, stored)?;
    let reported = round_distance(raw, cfg.distance_decimals);

    Ok(VerificationResult {
        verified: is_match(raw, threshold) && is_match(reported, threshold),
        distance: reported,
        threshold,
        metric: cfg.metric,
    })
}

/// Checks `live` against every saved embedding.
///
/// A failing comparison (wrong dimensions, zero vector) is recorded under its
/// label instead of aborting the others. The outcome is verified when any
/// label matched.
pub fn verify_against_saved(
    live: &[f32],
    saved: &HashMap<String, Vec<f32>>,
    cfg: &VerifyConfig,
) -> Result<VerificationOutcome, VerifyError> {
    if saved.is_empty() {
        return Err(VerifyError::NoSavedEmbeddings);
    }
    cfg.validate()?;

    let mut results = BTreeMap::new();
    for (label, stored) in saved {
        let entry = match verify_embeddings(live, stored, cfg) {
            Ok(result) => LabelResult::Decision(result),
            Err(err) => {
                tracing::debug!(label = %label, error = %err, "saved embedding not comparable");
                LabelResult::Failed {
                    error: err.to_string(),
                }
            }
        };
        results.insert(label.clone(), entry);
    }

    let is_verified = results.values().any(LabelResult::is_verified);
    Ok(VerificationOutcome {
        is_verified,
        results,
    })
}
