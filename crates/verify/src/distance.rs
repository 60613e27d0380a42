//! Distance functions over face embeddings.
//!
//! All arithmetic is done in `f64` so that symmetric inputs produce
//! bit-identical distances and threshold comparisons are not skewed by `f32`
//! accumulation error on 512-dimensional vectors.

use crate::types::{DistanceMetric, VerifyError};

/// Checks the shared preconditions of every metric: both vectors non-empty,
/// same length, all values finite.
pub(crate) fn check_pair(live: &[f32], stored: &[f32]) -> Result<(), VerifyError> {
    if live.is_empty() || stored.is_empty() {
        return Err(VerifyError::EmptyEmbedding);
    }
    if live.len() != stored.len() {
        return Err(VerifyError::DimensionMismatch {
            live: live.len(),
            stored: stored.len(),
        });
    }
    if live.iter().chain(stored.iter()).any(|v| !v.is_finite()) {
        return Err(VerifyError::NonFinite);
    }
    Ok(())
}

/// Cosine distance, `1 - cos(a, b)`. Ranges over `[0, 2]`.
///
/// Returns [`VerifyError::ZeroNorm`] when either vector has zero length since
/// the angle is undefined.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64, VerifyError> {
    check_pair(a, b)?;

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(VerifyError::ZeroNorm);
    }

    let similarity = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    Ok(1.0 - similarity)
}

/// Plain Euclidean distance between the raw vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f64, VerifyError> {
    check_pair(a, b)?;
    Ok(euclidean_unchecked(a.iter().map(|&v| f64::from(v)), b.iter().map(|&v| f64::from(v))))
}

/// Euclidean distance after L2-normalizing both vectors. Ranges over `[0, 2]`.
pub fn euclidean_l2_distance(a: &[f32], b: &[f32]) -> Result<f64, VerifyError> {
    check_pair(a, b)?;
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(VerifyError::ZeroNorm);
    }
    Ok(euclidean_unchecked(
        a.iter().map(|&v| f64::from(v) / norm_a),
        b.iter().map(|&v| f64::from(v) / norm_b),
    ))
}

/// Dispatches to the distance function for `metric`.
pub fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> Result<f64, VerifyError> {
    match metric {
        DistanceMetric::Cosine => cosine_distance(a, b),
        DistanceMetric::Euclidean => euclidean_distance(a, b),
        DistanceMetric::EuclideanL2 => euclidean_l2_distance(a, b),
    }
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

fn euclidean_unchecked(a: impl Iterator<Item = f64>, b: impl Iterator<Item = f64>) -> f64 {
    a.zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}
