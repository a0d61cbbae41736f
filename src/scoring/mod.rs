//! Error-based anomaly scoring
//!
//! - Threshold at a high percentile of the training-pass errors
//! - Logistic score in (0, 1) relative to the threshold
//! - Two-sided confidence: distance from the threshold, normalized

mod confidence;
mod scorer;
mod threshold;

pub use confidence::ConfidenceEstimator;
pub use scorer::{AnomalyScorer, WindowScore};
pub use threshold::{percentile_lower, THRESHOLD_PERCENTILE};

/// Guard against division by zero in normalizers
pub(crate) const EPSILON: f64 = 1e-12;
