//! Facegate verification decision.
//!
//! Given a live face embedding and a previously stored one, compute a distance
//! and decide match / no-match against a fixed threshold. Everything here is a
//! pure function of two vectors and a [`VerifyConfig`]; there is no state and
//! nothing is retried.
//!
//! ```
//! use verify::{verify_embeddings, VerifyConfig};
//!
//! let live = vec![0.1f32, 0.7, -0.2];
//! let stored = vec![0.1f32, 0.7, -0.2];
//! let result = verify_embeddings(&live, &stored, &VerifyConfig::default()).unwrap();
//! assert!(result.verified);
//! assert_eq!(result.distance, 0.0);
//! ```
//!
//! The default metric is cosine distance (`1 - cos`) with a threshold of
//! `0.60`. A distance equal to the threshold is **not** a match.

mod decision;
mod distance;
mod types;

pub use crate::decision::{is_match, round_distance, verify_against_saved, verify_embeddings};
pub use crate::distance::{cosine_distance, distance, euclidean_distance, euclidean_l2_distance};
pub use crate::types::{
    DistanceMetric, LabelResult, VerificationOutcome, VerificationResult, VerifyConfig,
    VerifyError,
};
