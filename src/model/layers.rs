//! Dense and batch-normalization layers with manual backpropagation

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Xavier/Glorot uniform initialization of an (n_in, n_out) matrix
pub(crate) fn xavier_uniform<R: Rng>(n_in: usize, n_out: usize, rng: &mut R) -> Array2<f64> {
    let scale = (2.0 / (n_in + n_out) as f64).sqrt();
    Array2::from_shape_fn((n_in, n_out), |_| rng.gen::<f64>() * 2.0 * scale - scale)
}

/// Fully connected layer: y = x·W + b
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Parameter gradients of a [`Dense`] layer
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl Dense {
    pub fn new<R: Rng>(n_in: usize, n_out: usize, rng: &mut R) -> Self {
        Self {
            weights: xavier_uniform(n_in, n_out, rng),
            bias: Array1::zeros(n_out),
        }
    }

    pub fn n_in(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_out(&self) -> usize {
        self.weights.ncols()
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }

    /// Gradients w.r.t. the parameters and the layer input
    pub fn backward(&self, input: &Array2<f64>, grad_out: &Array2<f64>) -> (DenseGrads, Array2<f64>) {
        let grads = DenseGrads {
            weights: input.t().dot(grad_out),
            bias: grad_out.sum_axis(Axis(0)),
        };
        let grad_in = grad_out.dot(&self.weights.t());
        (grads, grad_in)
    }
}

/// Batch normalization over the rows of a (batch, features) matrix.
///
/// Training mode normalizes with batch statistics and updates the running
/// statistics; evaluation mode uses the running statistics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchNorm {
    pub gamma: Array1<f64>,
    pub beta: Array1<f64>,
    running_mean: Array1<f64>,
    running_var: Array1<f64>,
    momentum: f64,
    eps: f64,
}

/// Values saved by the training forward pass for backpropagation
#[derive(Debug, Clone)]
pub struct NormCache {
    xhat: Array2<f64>,
    std: Array1<f64>,
}

/// Parameter gradients of a [`BatchNorm`] layer
#[derive(Debug, Clone)]
pub struct NormGrads {
    pub gamma: Array1<f64>,
    pub beta: Array1<f64>,
}

impl BatchNorm {
    pub fn new(num_features: usize, momentum: f64) -> Self {
        Self {
            gamma: Array1::ones(num_features),
            beta: Array1::zeros(num_features),
            running_mean: Array1::zeros(num_features),
            running_var: Array1::ones(num_features),
            momentum,
            eps: 1e-5,
        }
    }

    /// Forward pass with batch statistics
    pub fn forward_train(&mut self, x: &Array2<f64>) -> (Array2<f64>, NormCache) {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let centered = x - &mean;
        let var = centered.mapv(|v| v * v).sum_axis(Axis(0)) / n;

        // a single row carries no spread information
        if x.nrows() > 1 {
            self.running_mean = &self.running_mean * (1.0 - self.momentum) + &mean * self.momentum;
            self.running_var = &self.running_var * (1.0 - self.momentum) + &var * self.momentum;
        }

        let std = var.mapv(|v| (v + self.eps).sqrt());
        let xhat = centered / &std;
        let out = &xhat * &self.gamma + &self.beta;
        (out, NormCache { xhat, std })
    }

    /// Forward pass with running statistics
    pub fn forward_eval(&self, x: &Array2<f64>) -> Array2<f64> {
        let std = self.running_var.mapv(|v| (v + self.eps).sqrt());
        let xhat = (x - &self.running_mean) / &std;
        &xhat * &self.gamma + &self.beta
    }

    pub fn backward(&self, cache: &NormCache, grad_out: &Array2<f64>) -> (NormGrads, Array2<f64>) {
        let n = grad_out.nrows().max(1) as f64;
        let grads = NormGrads {
            gamma: (grad_out * &cache.xhat).sum_axis(Axis(0)),
            beta: grad_out.sum_axis(Axis(0)),
        };

        let dxhat = grad_out * &self.gamma;
        let sum_dxhat = dxhat.sum_axis(Axis(0));
        let sum_dxhat_xhat = (&dxhat * &cache.xhat).sum_axis(Axis(0));
        let grad_in = (dxhat * n - &sum_dxhat - &cache.xhat * &sum_dxhat_xhat) / (&cache.std * n);

        (grads, grad_in)
    }
}

pub fn relu(z: &Array2<f64>) -> Array2<f64> {
    z.mapv(|v| v.max(0.0))
}

/// Backpropagate through ReLU given its pre-activation input
pub fn relu_backward(z: &Array2<f64>, grad_out: &Array2<f64>) -> Array2<f64> {
    let mut grad = grad_out.clone();
    grad.zip_mut_with(z, |g, &v| {
        if v <= 0.0 {
            *g = 0.0;
        }
    });
    grad
}

/// Inverted dropout mask: kept units are scaled by 1 / (1 - rate)
pub fn dropout_mask<R: Rng>(shape: (usize, usize), rate: f64, rng: &mut R) -> Array2<f64> {
    if rate <= 0.0 {
        return Array2::ones(shape);
    }
    let keep = 1.0 - rate;
    Array2::from_shape_fn(shape, |_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_dense_shapes_and_grads() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let layer = Dense::new(3, 2, &mut rng);
        let x = array![[1.0, 2.0, 3.0], [0.5, -1.0, 0.0]];

        let y = layer.forward(&x);
        assert_eq!(y.dim(), (2, 2));

        let (grads, grad_in) = layer.backward(&x, &Array2::ones((2, 2)));
        assert_eq!(grads.weights.dim(), (3, 2));
        assert_eq!(grads.bias.to_vec(), vec![2.0, 2.0]);
        assert_eq!(grad_in.dim(), (2, 3));
    }

    #[test]
    fn test_xavier_bounds() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let layer = Dense::new(10, 6, &mut rng);
        let bound = (2.0 / 16.0_f64).sqrt();
        assert!(layer.weights.iter().all(|w| w.abs() <= bound));
    }

    #[test]
    fn test_batch_norm_train_normalizes() {
        let mut bn = BatchNorm::new(2, 0.1);
        let x = array![[1.0, 10.0], [3.0, 30.0], [5.0, 50.0]];
        let (out, _) = bn.forward_train(&x);

        for column in out.axis_iter(Axis(1)) {
            assert!(column.sum().abs() < 1e-9);
        }
        assert!((bn.running_mean[0] - 0.3).abs() < 1e-12);
        assert!((bn.running_var[0] - (0.9 + 0.1 * 8.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_batch_norm_eval_uses_running_stats() {
        let bn = BatchNorm::new(1, 0.1);
        let out = bn.forward_eval(&array![[2.0]]);
        assert!((out[[0, 0]] - 2.0 / (1.0 + 1e-5_f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_batch_norm_gradient_matches_finite_difference() {
        let x = array![[0.3, -1.2], [1.5, 0.4], [-0.7, 2.2], [0.1, 0.0]];
        let weights = array![[0.5, -0.3], [1.1, 0.7], [-0.2, 0.9], [0.4, -1.0]];
        // loss = sum(out * weights)
        let loss = |input: &Array2<f64>| {
            let mut bn = BatchNorm::new(2, 0.1);
            let (out, _) = bn.forward_train(input);
            (&out * &weights).sum()
        };

        let mut bn = BatchNorm::new(2, 0.1);
        let (_, cache) = bn.forward_train(&x);
        let (_, grad_in) = bn.backward(&cache, &weights);

        let h = 1e-6;
        for i in 0..x.nrows() {
            for j in 0..x.ncols() {
                let mut plus = x.clone();
                plus[[i, j]] += h;
                let mut minus = x.clone();
                minus[[i, j]] -= h;
                let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
                assert!((numeric - grad_in[[i, j]]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_relu_backward_masks() {
        let z = array![[-1.0, 2.0], [0.0, 3.0]];
        let grad = relu_backward(&z, &Array2::ones((2, 2)));
        assert_eq!(grad, array![[0.0, 1.0], [0.0, 1.0]]);
        assert_eq!(relu(&z), array![[0.0, 2.0], [0.0, 3.0]]);
    }

    #[test]
    fn test_dropout_mask_values() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mask = dropout_mask((20, 20), 0.5, &mut rng);
        assert!(mask.iter().all(|&m| m == 0.0 || m == 2.0));
        assert!(mask.iter().any(|&m| m == 0.0));
        assert_eq!(dropout_mask((2, 2), 0.0, &mut rng), Array2::<f64>::ones((2, 2)));
    }
}
