//! Recurrent encoder stage and attention pooling over time steps
//!
//! Step sequences are (B·W, H) matrices where row `b·W + t` holds step `t`
//! of window `b`, the layout the time-distributed decoder stage also uses.

use ndarray::{s, Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::layers::xavier_uniform;
use super::optimizer::Adam;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Softmax over each row
fn softmax_rows(x: &Array2<f64>) -> Array2<f64> {
    let mut result = x.clone();
    for mut row in result.rows_mut() {
        let max_val = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max_val).exp());
        let sum = row.sum();
        row /= sum;
    }
    result
}

/// One GRU gate pre-activation: x·W + h·U + b
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub input: Array2<f64>,
    pub recurrent: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Parameter gradients of a [`Gate`]
#[derive(Debug, Clone)]
pub struct GateGrads {
    pub input: Array2<f64>,
    pub recurrent: Array2<f64>,
    pub bias: Array1<f64>,
}

impl Gate {
    fn new<R: Rng>(n_in: usize, hidden: usize, rng: &mut R) -> Self {
        Self {
            input: xavier_uniform(n_in, hidden, rng),
            recurrent: xavier_uniform(hidden, hidden, rng),
            bias: Array1::zeros(hidden),
        }
    }

    fn pre_activation(&self, x: &Array2<f64>, h: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.input) + h.dot(&self.recurrent) + &self.bias
    }

    fn zero_grads(&self) -> GateGrads {
        GateGrads {
            input: Array2::zeros(self.input.raw_dim()),
            recurrent: Array2::zeros(self.recurrent.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }
}

impl GateGrads {
    fn accumulate(&mut self, x: &Array2<f64>, h: &Array2<f64>, grad: &Array2<f64>) {
        self.input += &x.t().dot(grad);
        self.recurrent += &h.t().dot(grad);
        self.bias += &grad.sum_axis(Axis(0));
    }
}

/// Gated recurrent unit run over the W steps of every window.
///
/// ```text
/// r  = σ(x·Wr + h·Ur + br)
/// z  = σ(x·Wz + h·Uz + bz)
/// n  = tanh(x·Wn + (r ⊙ h)·Un + bn)
/// h' = (1 - z) ⊙ n + z ⊙ h
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gru {
    pub reset: Gate,
    pub update: Gate,
    pub candidate: Gate,
}

#[derive(Debug, Clone)]
struct StepCache {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    r: Array2<f64>,
    z: Array2<f64>,
    n: Array2<f64>,
    rh: Array2<f64>,
}

/// Per-step values kept for backpropagation through time
#[derive(Debug, Clone)]
pub struct GruCache {
    steps: Vec<StepCache>,
}

/// Parameter gradients of a [`Gru`]
#[derive(Debug, Clone)]
pub struct GruGrads {
    pub reset: GateGrads,
    pub update: GateGrads,
    pub candidate: GateGrads,
}

impl Gru {
    pub fn new<R: Rng>(n_in: usize, hidden: usize, rng: &mut R) -> Self {
        Self {
            reset: Gate::new(n_in, hidden, rng),
            update: Gate::new(n_in, hidden, rng),
            candidate: Gate::new(n_in, hidden, rng),
        }
    }

    pub fn n_in(&self) -> usize {
        self.reset.input.nrows()
    }

    pub fn hidden_dim(&self) -> usize {
        self.reset.recurrent.nrows()
    }

    /// Run over (B, W·K) windows from a zero state; returns every hidden
    /// state as (B·W, H)
    pub fn forward(&self, x: &Array2<f64>, window: usize) -> (Array2<f64>, GruCache) {
        let batch = x.nrows();
        let (n_in, hidden) = (self.n_in(), self.hidden_dim());
        let mut states = Array2::<f64>::zeros((batch * window, hidden));
        let mut h = Array2::<f64>::zeros((batch, hidden));
        let mut steps = Vec::with_capacity(window);

        for t in 0..window {
            let x_t = x.slice(s![.., t * n_in..(t + 1) * n_in]).to_owned();
            let r = self.reset.pre_activation(&x_t, &h).mapv(sigmoid);
            let z = self.update.pre_activation(&x_t, &h).mapv(sigmoid);
            let rh = &r * &h;
            let n = self.candidate.pre_activation(&x_t, &rh).mapv(f64::tanh);
            let h_next = &n + &(&z * &(&h - &n));

            states.slice_mut(s![t..;window, ..]).assign(&h_next);
            steps.push(StepCache {
                x: x_t,
                h_prev: h,
                r,
                z,
                n,
                rh,
            });
            h = h_next;
        }

        (states, GruCache { steps })
    }

    /// Backpropagation through time given the gradient w.r.t. every state
    pub fn backward(&self, cache: &GruCache, grad_states: &Array2<f64>) -> GruGrads {
        let window = cache.steps.len();
        let mut grads = GruGrads {
            reset: self.reset.zero_grads(),
            update: self.update.zero_grads(),
            candidate: self.candidate.zero_grads(),
        };
        if window == 0 {
            return grads;
        }

        let batch = grad_states.nrows() / window;
        let mut grad_next = Array2::<f64>::zeros((batch, self.hidden_dim()));
        for (t, step) in cache.steps.iter().enumerate().rev() {
            let grad_h = &grad_states.slice(s![t..;window, ..]) + &grad_next;
            let grad_n = &grad_h * &step.z.mapv(|z| 1.0 - z);
            let grad_z = &grad_h * &(&step.h_prev - &step.n);
            let mut grad_prev = &grad_h * &step.z;

            let grad_a_n = grad_n * &step.n.mapv(|n| 1.0 - n * n);
            grads.candidate.accumulate(&step.x, &step.rh, &grad_a_n);
            let grad_rh = grad_a_n.dot(&self.candidate.recurrent.t());
            grad_prev += &(&grad_rh * &step.r);
            let grad_r = &grad_rh * &step.h_prev;

            let grad_a_z = grad_z * &step.z.mapv(|z| z * (1.0 - z));
            let grad_a_r = grad_r * &step.r.mapv(|r| r * (1.0 - r));
            grads.update.accumulate(&step.x, &step.h_prev, &grad_a_z);
            grads.reset.accumulate(&step.x, &step.h_prev, &grad_a_r);
            grad_prev += &grad_a_z.dot(&self.update.recurrent.t());
            grad_prev += &grad_a_r.dot(&self.reset.recurrent.t());

            grad_next = grad_prev;
        }
        grads
    }

    /// Optimizer step for the nine gate tensors, using slots from `first_slot`
    pub fn apply(&mut self, grads: &GruGrads, adam: &mut Adam, first_slot: usize) {
        let gates = [
            (&mut self.reset, &grads.reset),
            (&mut self.update, &grads.update),
            (&mut self.candidate, &grads.candidate),
        ];
        for (i, (gate, grad)) in gates.into_iter().enumerate() {
            let slot = first_slot + 3 * i;
            adam.update(slot, &mut gate.input, &grad.input);
            adam.update(slot + 1, &mut gate.recurrent, &grad.recurrent);
            adam.update(slot + 2, &mut gate.bias, &grad.bias);
        }
    }
}

/// Softmax attention over the time steps of each window.
///
/// score_t = v · tanh(s_t) and the pooled vector is Σ_t softmax(score)_t · s_t.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionPool {
    pub weights: Array1<f64>,
}

/// Values kept for backpropagation; `attention` is (B, W) with rows summing to 1
#[derive(Debug, Clone)]
pub struct AttentionCache {
    states: Array2<f64>,
    activated: Array2<f64>,
    attention: Array2<f64>,
}

impl AttentionPool {
    pub fn new<R: Rng>(dim: usize, rng: &mut R) -> Self {
        Self {
            weights: xavier_uniform(dim, 1, rng).column(0).to_owned(),
        }
    }

    /// Pool (B·W, H) step states into (B, H)
    pub fn forward(&self, states: &Array2<f64>, window: usize) -> (Array2<f64>, AttentionCache) {
        let window = window.max(1);
        let batch = states.nrows() / window;
        let activated = states.mapv(f64::tanh);
        let flat_scores = activated.dot(&self.weights);
        let scores = Array2::from_shape_fn((batch, window), |(b, t)| flat_scores[b * window + t]);
        let attention = softmax_rows(&scores);

        let mut pooled = Array2::<f64>::zeros((batch, states.ncols()));
        for t in 0..window {
            let weight_t = attention.column(t).insert_axis(Axis(1));
            pooled += &(&states.slice(s![t..;window, ..]) * &weight_t);
        }

        let cache = AttentionCache {
            states: states.clone(),
            activated,
            attention,
        };
        (pooled, cache)
    }

    /// Gradients w.r.t. the scoring vector and the step states
    pub fn backward(&self, cache: &AttentionCache, grad_pooled: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
        let (batch, window) = cache.attention.dim();
        let mut grad_states = Array2::<f64>::zeros(cache.states.raw_dim());
        let mut grad_attention = Array2::<f64>::zeros((batch, window));

        for t in 0..window {
            let weight_t = cache.attention.column(t).insert_axis(Axis(1));
            grad_states
                .slice_mut(s![t..;window, ..])
                .assign(&(grad_pooled * &weight_t));
            let states_t = cache.states.slice(s![t..;window, ..]);
            grad_attention
                .column_mut(t)
                .assign(&(&states_t * grad_pooled).sum_axis(Axis(1)));
        }

        // softmax
        let expected = (&cache.attention * &grad_attention)
            .sum_axis(Axis(1))
            .insert_axis(Axis(1));
        let grad_scores = &cache.attention * &(&grad_attention - &expected);
        // (B, W) row-major matches the b·W + t state layout
        let grad_scores = Array1::from_iter(grad_scores.iter().copied());

        let grad_weights = cache.activated.t().dot(&grad_scores);
        let tanh_grad = cache.activated.mapv(|a| 1.0 - a * a);
        grad_states += &(&(&tanh_grad * &grad_scores.view().insert_axis(Axis(1))) * &self.weights);

        (grad_weights, grad_states)
    }
}
