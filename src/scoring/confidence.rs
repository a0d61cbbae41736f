//! Confidence from the distance to the threshold

use serde::{Deserialize, Serialize};

use super::EPSILON;

/// Confidence = |error - threshold| / max_distance, clamped to [0, 1].
///
/// High for clearly normal and clearly anomalous windows alike, low near
/// the threshold. `max_distance` is the largest distance seen during
/// training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEstimator {
    threshold: f64,
    max_distance: f64,
}

impl ConfidenceEstimator {
    pub fn new(threshold: f64, max_distance: f64) -> Self {
        Self {
            threshold,
            max_distance,
        }
    }

    /// Derive the normalizer from the training-pass errors
    pub fn fit(errors: &[f64], threshold: f64) -> Self {
        let max_distance = errors
            .iter()
            .map(|e| (e - threshold).abs())
            .fold(0.0, f64::max);
        Self::new(threshold, max_distance)
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn confidence(&self, error: f64) -> f64 {
        ((error - self.threshold).abs() / self.max_distance.max(EPSILON)).clamp(0.0, 1.0)
    }
}
