//! Training loop for the reconstruction network

use ndarray::{s, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, info};

use super::autoencoder::{mse, ReconstructionNetwork};
use super::optimizer::Adam;
use crate::config::ModelConfig;
use crate::error::{LensError, Result};

/// Losses recorded at the end of one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub train_windows: usize,
    pub validation_windows: usize,
    pub final_train_loss: f64,
    pub final_validation_loss: Option<f64>,
    pub history: Vec<EpochMetrics>,
}

/// Trains a [`ReconstructionNetwork`] on a batch of flattened windows
#[derive(Debug, Clone)]
pub struct Trainer {
    config: ModelConfig,
}

impl Trainer {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Fit a fresh network to `windows`, shaped (n, window · n_features).
    ///
    /// The last ⌊n · validation_split⌋ windows are held out and only
    /// monitored. Fails if the loss becomes non-finite.
    pub fn fit(
        &self,
        windows: &Array2<f64>,
        window: usize,
        n_features: usize,
    ) -> Result<(ReconstructionNetwork, TrainingSummary)> {
        self.config.validate()?;
        let n_samples = windows.nrows();
        if n_samples == 0 {
            return Err(LensError::InsufficientData { rows: 0, required: 1 });
        }

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        let mut network = ReconstructionNetwork::new(window, n_features, &self.config, &mut rng);
        let mut adam = Adam::new(self.config.learning_rate, self.config.weight_decay);

        // Split for validation
        let val_size = ((n_samples as f64 * self.config.validation_split) as usize).min(n_samples - 1);
        let train_size = n_samples - val_size;
        let x_train = windows.slice(s![..train_size, ..]).to_owned();
        let x_val = windows.slice(s![train_size.., ..]).to_owned();

        info!(
            train = train_size,
            validation = val_size,
            epochs = self.config.epochs,
            "Training reconstruction model"
        );

        let mut history = Vec::with_capacity(self.config.epochs);
        for epoch in 0..self.config.epochs {
            let mut indices: Vec<usize> = (0..train_size).collect();
            indices.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            for range in batch_ranges(train_size, self.config.batch_size) {
                let x_batch = gather_rows(&x_train, &indices[range])?;

                let (output, cache) = network.forward_train(&x_batch, &mut rng)?;
                let loss = mse(&output, &x_batch);
                if !loss.is_finite() {
                    return Err(LensError::Training(format!(
                        "non-finite loss at epoch {}",
                        epoch + 1
                    )));
                }
                loss_sum += loss * x_batch.nrows() as f64;

                let grad_out = (&output - &x_batch) * (2.0 / output.len() as f64);
                let grads = network.backward(&cache, &grad_out)?;
                adam.tick();
                network.apply(&grads, &mut adam);
            }

            let train_loss = loss_sum / train_size as f64;
            let validation_loss = if val_size > 0 {
                let errors = network.window_errors(&x_val)?;
                Some(errors.iter().sum::<f64>() / errors.len() as f64)
            } else {
                None
            };

            debug!(epoch = epoch + 1, train_loss, validation_loss = ?validation_loss, "Epoch complete");
            history.push(EpochMetrics {
                epoch: epoch + 1,
                train_loss,
                validation_loss,
            });
        }

        let last = history.last().cloned();
        let summary = TrainingSummary {
            epochs: history.len(),
            train_windows: train_size,
            validation_windows: val_size,
            final_train_loss: last.as_ref().map(|m| m.train_loss).unwrap_or(f64::NAN),
            final_validation_loss: last.and_then(|m| m.validation_loss),
            history,
        };
        info!(
            epochs = summary.epochs,
            loss = summary.final_train_loss,
            steps = adam.steps(),
            "Training complete"
        );

        Ok((network, summary))
    }
}

/// Mini-batch boundaries; a trailing single-row batch is folded into the
/// previous one
fn batch_ranges(n: usize, batch_size: usize) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = (0..n)
        .step_by(batch_size.max(1))
        .map(|start| start..(start + batch_size).min(n))
        .collect();
    if ranges.len() > 1 && ranges.last().map(|r| r.len()) == Some(1) {
        ranges.pop();
        if let Some(prev) = ranges.last_mut() {
            prev.end = n;
        }
    }
    ranges
}

fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Result<Array2<f64>> {
    let n_cols = x.ncols();
    let mut rows = Vec::with_capacity(indices.len() * n_cols);
    for &i in indices {
        rows.extend(x.row(i).iter().copied());
    }
    Ok(Array2::from_shape_vec((indices.len(), n_cols), rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(n: usize, width: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, width), |(i, j)| ((i + j) as f64 * 0.7).sin())
    }

    fn small_config() -> ModelConfig {
        ModelConfig {
            hidden_dim: 6,
            latent_dim: 3,
            epochs: 5,
            batch_size: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_ranges() {
        assert_eq!(batch_ranges(10, 4), vec![0..4, 4..8, 8..10]);
        assert_eq!(batch_ranges(9, 4), vec![0..4, 4..9]);
        assert_eq!(batch_ranges(1, 4), vec![0..1]);
    }

    #[test]
    fn test_fit_summary() {
        let (network, summary) = Trainer::new(small_config()).fit(&windows(20, 6), 3, 2).unwrap();

        assert_eq!(network.input_width(), 6);
        assert_eq!(summary.epochs, 5);
        assert_eq!(summary.validation_windows, 2);
        assert_eq!(summary.train_windows, 18);
        assert!(summary.final_train_loss.is_finite());
        assert!(summary.final_validation_loss.is_some());
        assert_eq!(summary.history.len(), 5);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let x = windows(12, 4);
        let (a, _) = Trainer::new(small_config()).fit(&x, 2, 2).unwrap();
        let (b, _) = Trainer::new(small_config()).fit(&x, 2, 2).unwrap();
        assert_eq!(a.window_errors(&x).unwrap(), b.window_errors(&x).unwrap());
    }

    #[test]
    fn test_validation_leaves_one_training_window() {
        let config = ModelConfig {
            validation_split: 0.9,
            ..small_config()
        };
        let (_, summary) = Trainer::new(config).fit(&windows(2, 2), 1, 2).unwrap();
        assert_eq!(summary.train_windows, 1);
        assert_eq!(summary.validation_windows, 1);
    }

    #[test]
    fn test_non_finite_input_is_training_error() {
        let mut x = windows(6, 2);
        x[[2, 1]] = f64::NAN;
        let result = Trainer::new(small_config()).fit(&x, 1, 2);
        assert!(matches!(result, Err(LensError::Training(_))));
    }
}
