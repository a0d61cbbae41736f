//! Threshold, logistic score and flags for window errors

use serde::{Deserialize, Serialize};
use tracing::info;

use super::confidence::ConfidenceEstimator;
use super::threshold::{percentile_lower, THRESHOLD_PERCENTILE};
use super::EPSILON;
use crate::error::{LensError, Result};

const MIN_SCORE: f64 = 1e-9;
const MAX_SCORE: f64 = 1.0 - 1e-9;

/// Scoring outcome for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowScore {
    /// Index of the window's first row
    pub start: usize,
    pub error: f64,
    pub score: f64,
    pub confidence: f64,
    pub is_anomaly: bool,
}

/// Fitted threshold and confidence normalizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScorer {
    threshold: f64,
    confidence: ConfidenceEstimator,
}

impl AnomalyScorer {
    /// Fit on the training-pass errors of every window
    pub fn fit(errors: &[f64]) -> Result<Self> {
        if errors.iter().any(|e| !e.is_finite()) {
            return Err(LensError::Training("non-finite reconstruction error".to_string()));
        }
        let threshold = percentile_lower(errors, THRESHOLD_PERCENTILE)?;
        let confidence = ConfidenceEstimator::fit(errors, threshold);

        info!(
            threshold,
            max_distance = confidence.max_distance(),
            windows = errors.len(),
            "Fitted anomaly threshold"
        );
        Ok(Self {
            threshold,
            confidence,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_distance(&self) -> f64 {
        self.confidence.max_distance()
    }

    /// Flag strictly above the threshold
    pub fn is_anomaly(&self, error: f64) -> bool {
        error > self.threshold
    }

    /// Logistic of the threshold-relative excess, kept inside (0, 1)
    pub fn score(&self, error: f64) -> f64 {
        let z = (error - self.threshold) / self.threshold.max(EPSILON);
        (1.0 / (1.0 + (-z).exp())).clamp(MIN_SCORE, MAX_SCORE)
    }

    pub fn confidence(&self, error: f64) -> f64 {
        self.confidence.confidence(error)
    }

    pub fn score_window(&self, start: usize, error: f64) -> WindowScore {
        WindowScore {
            start,
            error,
            score: self.score(error),
            confidence: self.confidence(error),
            is_anomaly: self.is_anomaly(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_all(scorer: &AnomalyScorer, errors: &[f64]) -> Vec<WindowScore> {
        errors
            .iter()
            .enumerate()
            .map(|(start, &error)| scorer.score_window(start, error))
            .collect()
    }

    fn outlier_errors() -> Vec<f64> {
        let mut errors = vec![0.0; 19];
        errors.push(100.0);
        errors
    }

    #[test]
    fn test_flags_only_above_threshold() {
        let scorer = AnomalyScorer::fit(&outlier_errors()).unwrap();
        let scores = score_all(&scorer, &outlier_errors());

        let flagged: Vec<usize> = scores.iter().filter(|s| s.is_anomaly).map(|s| s.start).collect();
        assert_eq!(flagged, vec![19]);
        assert!(!scorer.is_anomaly(scorer.threshold()));
    }

    #[test]
    fn test_score_monotonic_and_bounded() {
        let scorer = AnomalyScorer::fit(&outlier_errors()).unwrap();
        let mut previous = 0.0;
        for e in [0.0, 1.0, 5.0, 10.0, 100.0, 1e6] {
            let score = scorer.score(e);
            assert!(score > 0.0 && score < 1.0);
            assert!(score >= previous);
            previous = score;
        }
        assert!((scorer.score(scorer.threshold()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_identical_errors_flag_nothing() {
        let errors = vec![0.3; 8];
        let scorer = AnomalyScorer::fit(&errors).unwrap();
        assert!((scorer.threshold() - 0.3).abs() < 1e-15);
        assert!(score_all(&scorer, &errors).iter().all(|s| !s.is_anomaly));
    }

    #[test]
    fn test_zero_threshold_score_saturates() {
        let scorer = AnomalyScorer::fit(&[0.0; 5]).unwrap();
        assert_eq!(scorer.score(1.0), MAX_SCORE);
        assert_eq!(scorer.score(0.0), 0.5);
    }

    #[test]
    fn test_non_finite_errors_rejected() {
        assert!(matches!(
            AnomalyScorer::fit(&[0.1, f64::NAN]),
            Err(LensError::Training(_))
        ));
    }
}
