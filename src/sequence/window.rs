//! Overlapping fixed-length windows over consecutive rows

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LensError, Result};

/// A W×K window of consecutive rows, identified by its first row
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub start: usize,
    pub values: Array2<f64>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Row indices covered by this window
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len()
    }
}

/// Window length rule: W = max(1, min(max_window, N-1))
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceWindower {
    max_window: usize,
}

impl SequenceWindower {
    pub fn new(max_window: usize) -> Self {
        Self { max_window }
    }

    /// Effective window length for `n_rows` rows
    pub fn window_length(&self, n_rows: usize) -> Result<usize> {
        if n_rows <= 1 {
            return Err(LensError::InsufficientData {
                rows: n_rows,
                required: 2,
            });
        }
        Ok(self.max_window.min(n_rows - 1).max(1))
    }
}

/// Window the matrix with an explicit length; fails whenever N <= W
pub fn windows_of_length(values: &Array2<f64>, window: usize) -> Result<Vec<Sequence>> {
    let n_rows = values.nrows();
    if window == 0 || n_rows <= window {
        return Err(LensError::InsufficientData {
            rows: n_rows,
            required: window + 1,
        });
    }

    let sequences: Vec<Sequence> = (0..=n_rows - window)
        .map(|start| Sequence {
            start,
            values: values.slice(s![start..start + window, ..]).to_owned(),
        })
        .collect();

    debug!(rows = n_rows, window, sequences = sequences.len(), "Built sequences");
    Ok(sequences)
}

/// Stack windows into a (n, W·K) batch, each window flattened row-major
pub fn to_batch(sequences: &[Sequence]) -> Result<Array2<f64>> {
    let width = sequences.first().map(|s| s.values.len()).unwrap_or(0);
    let mut flat = Vec::with_capacity(sequences.len() * width);
    for seq in sequences {
        if seq.values.len() != width {
            return Err(LensError::Shape {
                expected: format!("{} values per window", width),
                actual: format!("{} values", seq.values.len()),
            });
        }
        flat.extend(seq.values.iter().cloned());
    }
    Ok(Array2::from_shape_vec((sequences.len(), width), flat)?)
}
