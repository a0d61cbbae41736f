//! Encoder-decoder network over flattened windows
//!
//! A batch of windows is a (B, W·K) matrix, each row one window flattened
//! row-major. A recurrent stage reads the W steps of each window in order
//! and attention pools its states into one vector per window; the decoder
//! expands the latent vector back to W steps and maps each to K features
//! with shared weights.
//!
//! ```text
//! encoder: GRU K→H over W steps → BatchNorm → Dropout → attention pool → Dense H→L → ReLU
//! decoder: Dense L→W·H → ReLU → Dropout → Dense H→K per step
//! ```

use ndarray::{Array1, Array2};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::layers::{dropout_mask, relu, relu_backward, BatchNorm, Dense, DenseGrads, NormCache, NormGrads};
use super::optimizer::Adam;
use super::recurrent::{AttentionCache, AttentionPool, Gru, GruCache, GruGrads};
use crate::config::ModelConfig;
use crate::error::{LensError, Result};

/// Reconstruction network for windows of a fixed shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionNetwork {
    window: usize,
    n_features: usize,
    hidden_dim: usize,
    dropout: f64,
    recurrent: Gru,
    norm: BatchNorm,
    attention: AttentionPool,
    latent: Dense,
    expand: Dense,
    step_decoder: Dense,
}

/// Intermediate values of a training forward pass
#[derive(Debug, Clone)]
pub struct ForwardCache {
    recurrent_cache: GruCache,
    norm_cache: NormCache,
    hidden_mask: Array2<f64>,
    attention_cache: AttentionCache,
    pooled: Array2<f64>,
    latent_pre: Array2<f64>,
    latent_out: Array2<f64>,
    expand_pre: Array2<f64>,
    expand_mask: Array2<f64>,
    expand_steps: Array2<f64>,
}

/// Gradients for every trainable tensor of the network
#[derive(Debug, Clone)]
pub struct NetworkGrads {
    recurrent: GruGrads,
    norm: NormGrads,
    attention: Array1<f64>,
    latent: DenseGrads,
    expand: DenseGrads,
    step_decoder: DenseGrads,
}

impl ReconstructionNetwork {
    pub fn new<R: Rng>(window: usize, n_features: usize, config: &ModelConfig, rng: &mut R) -> Self {
        let hidden = config.hidden_dim;
        let latent = config.latent_dim;

        Self {
            window,
            n_features,
            hidden_dim: hidden,
            dropout: config.dropout,
            recurrent: Gru::new(n_features, hidden, rng),
            norm: BatchNorm::new(hidden, config.norm_momentum),
            attention: AttentionPool::new(hidden, rng),
            latent: Dense::new(hidden, latent, rng),
            expand: Dense::new(latent, window * hidden, rng),
            step_decoder: Dense::new(hidden, n_features, rng),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Width of one flattened window (W·K)
    pub fn input_width(&self) -> usize {
        self.window * self.n_features
    }

    /// Training-mode forward pass: batch statistics and dropout
    pub fn forward_train<R: Rng>(&mut self, x: &Array2<f64>, rng: &mut R) -> Result<(Array2<f64>, ForwardCache)> {
        self.check_width(x)?;
        let batch = x.nrows();
        let (w, h, k) = (self.window, self.hidden_dim, self.n_features);

        let (states, recurrent_cache) = self.recurrent.forward(x, w);
        let (normed, norm_cache) = self.norm.forward_train(&states);
        let hidden_mask = dropout_mask(normed.dim(), self.dropout, rng);
        let hidden = normed * &hidden_mask;
        let (pooled, attention_cache) = self.attention.forward(&hidden, w);

        let latent_pre = self.latent.forward(&pooled);
        let latent_out = relu(&latent_pre);

        let expand_pre = self.expand.forward(&latent_out);
        let expand_mask = dropout_mask(expand_pre.dim(), self.dropout, rng);
        let expanded = relu(&expand_pre) * &expand_mask;
        let expand_steps = reshape(&expanded, batch * w, h)?;

        let steps_out = self.step_decoder.forward(&expand_steps);
        let output = reshape(&steps_out, batch, w * k)?;

        let cache = ForwardCache {
            recurrent_cache,
            norm_cache,
            hidden_mask,
            attention_cache,
            pooled,
            latent_pre,
            latent_out,
            expand_pre,
            expand_mask,
            expand_steps,
        };
        Ok((output, cache))
    }

    /// Backpropagate the gradient of the loss w.r.t. the network output
    pub fn backward(&self, cache: &ForwardCache, grad_out: &Array2<f64>) -> Result<NetworkGrads> {
        let batch = grad_out.nrows();
        let (w, h, k) = (self.window, self.hidden_dim, self.n_features);

        let grad_steps = reshape(grad_out, batch * w, k)?;
        let (step_decoder, grad_expand_steps) = self.step_decoder.backward(&cache.expand_steps, &grad_steps);

        let grad_expanded = reshape(&grad_expand_steps, batch, w * h)? * &cache.expand_mask;
        let grad_expand_pre = relu_backward(&cache.expand_pre, &grad_expanded);
        let (expand, grad_latent_out) = self.expand.backward(&cache.latent_out, &grad_expand_pre);

        let grad_latent_pre = relu_backward(&cache.latent_pre, &grad_latent_out);
        let (latent, grad_pooled) = self.latent.backward(&cache.pooled, &grad_latent_pre);

        let (attention, grad_hidden) = self.attention.backward(&cache.attention_cache, &grad_pooled);
        let grad_normed = grad_hidden * &cache.hidden_mask;
        let (norm, grad_states) = self.norm.backward(&cache.norm_cache, &grad_normed);
        let recurrent = self.recurrent.backward(&cache.recurrent_cache, &grad_states);

        Ok(NetworkGrads {
            recurrent,
            norm,
            attention,
            latent,
            expand,
            step_decoder,
        })
    }

    /// Apply one optimizer step to every trainable tensor
    pub fn apply(&mut self, grads: &NetworkGrads, adam: &mut Adam) {
        self.recurrent.apply(&grads.recurrent, adam, 0);
        adam.update(9, &mut self.norm.gamma, &grads.norm.gamma);
        adam.update(10, &mut self.norm.beta, &grads.norm.beta);
        adam.update(11, &mut self.attention.weights, &grads.attention);
        adam.update(12, &mut self.latent.weights, &grads.latent.weights);
        adam.update(13, &mut self.latent.bias, &grads.latent.bias);
        adam.update(14, &mut self.expand.weights, &grads.expand.weights);
        adam.update(15, &mut self.expand.bias, &grads.expand.bias);
        adam.update(16, &mut self.step_decoder.weights, &grads.step_decoder.weights);
        adam.update(17, &mut self.step_decoder.bias, &grads.step_decoder.bias);
    }

    /// Evaluation-mode reconstruction: running statistics, no dropout
    pub fn reconstruct(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x)?;
        let batch = x.nrows();
        let (w, h, k) = (self.window, self.hidden_dim, self.n_features);

        let (states, _) = self.recurrent.forward(x, w);
        let (pooled, _) = self.attention.forward(&self.norm.forward_eval(&states), w);
        let latent = relu(&self.latent.forward(&pooled));
        let expanded = relu(&self.expand.forward(&latent));
        let steps_out = self.step_decoder.forward(&reshape(&expanded, batch * w, h)?);
        reshape(&steps_out, batch, w * k)
    }

    /// Mean squared reconstruction error of each window (row) of `x`
    pub fn window_errors(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        let recon = self.reconstruct(x)?;
        let width = x.ncols().max(1) as f64;

        let errors = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                x.row(i)
                    .iter()
                    .zip(recon.row(i).iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    / width
            })
            .collect();
        Ok(errors)
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.input_width() {
            return Err(LensError::Shape {
                expected: format!("{} values per window", self.input_width()),
                actual: format!("{} values", x.ncols()),
            });
        }
        Ok(())
    }
}

/// Row-major reshape that also accepts non-contiguous input
fn reshape(a: &Array2<f64>, rows: usize, cols: usize) -> Result<Array2<f64>> {
    Ok(Array2::from_shape_vec((rows, cols), a.iter().cloned().collect())?)
}

/// Mean squared error over every entry
pub fn mse(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let n = a.len().max(1) as f64;
    (a - b).mapv(|d| d * d).sum() / n
}
