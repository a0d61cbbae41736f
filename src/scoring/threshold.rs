//! Percentile threshold

use crate::error::{LensError, Result};

/// Percentile of the training-pass errors used as the anomaly threshold
pub const THRESHOLD_PERCENTILE: f64 = 95.0;

/// Percentile taking the lower of the two closest ranks.
///
/// `rank = q / 100 · (n - 1)` over the sorted values and the result is
/// `sorted[floor(rank)]`, always one of the observed values. At the 95th
/// percentile with 2 <= n <= 20 the result is below the top rank, so a
/// strictly largest value lies above it.
pub fn percentile_lower(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(LensError::InsufficientData { rows: 0, required: 1 });
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(LensError::InvalidParameter {
            name: "q".to_string(),
            value: q.to_string(),
            reason: "must be in [0, 100]".to_string(),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    Ok(sorted[rank.floor() as usize])
}
