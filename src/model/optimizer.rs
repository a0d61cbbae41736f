//! Adam optimizer with L2 weight decay

use ndarray::{Array, Dimension, Zip};

/// Adam over a fixed, ordered set of parameter tensors.
///
/// Each parameter is addressed by its slot index; the moment estimates are
/// created lazily on the first update of a slot.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    weight_decay: f64,
    step: i32,
    moments: Vec<Option<(Vec<f64>, Vec<f64>)>>,
}

impl Adam {
    pub fn new(learning_rate: f64, weight_decay: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay,
            step: 0,
            moments: Vec::new(),
        }
    }

    /// Advance the shared time step; call once per mini-batch
    pub fn tick(&mut self) {
        self.step += 1;
    }

    pub fn steps(&self) -> i32 {
        self.step
    }

    /// Apply one update to the parameter in `slot`
    pub fn update<D: Dimension>(&mut self, slot: usize, param: &mut Array<f64, D>, grad: &Array<f64, D>) {
        if self.moments.len() <= slot {
            self.moments.resize(slot + 1, None);
        }
        let size = param.len();
        let (m, v) = self.moments[slot].get_or_insert_with(|| (vec![0.0; size], vec![0.0; size]));

        let t = self.step.max(1);
        let bias1 = 1.0 - self.beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);
        let (beta1, beta2, eps, lr, decay) = (self.beta1, self.beta2, self.eps, self.learning_rate, self.weight_decay);

        let mut i = 0;
        Zip::from(param).and(grad).for_each(|p, &g| {
            let g = g + decay * *p;
            m[i] = beta1 * m[i] + (1.0 - beta1) * g;
            v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;
            let m_hat = m[i] / bias1;
            let v_hat = v[i] / bias2;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
            i += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.1, 0.0);
        let mut w = array![[1.0, -1.0]];
        adam.tick();
        adam.update(0, &mut w, &array![[0.5, -2.0]]);

        // bias-corrected first step is lr * sign(g)
        assert!((w[[0, 0]] - 0.9).abs() < 1e-6);
        assert!((w[[0, 1]] + 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_minimizes_quadratic() {
        let mut adam = Adam::new(0.05, 0.0);
        let mut x = Array1::from(vec![3.0, -2.0]);
        for _ in 0..500 {
            let grad = &x * 2.0;
            adam.tick();
            adam.update(0, &mut x, &grad);
        }
        assert!(x.iter().all(|v| v.abs() < 0.05));
    }

    #[test]
    fn test_weight_decay_shrinks_without_gradient() {
        let mut adam = Adam::new(0.01, 0.1);
        let mut w = array![2.0];
        adam.tick();
        adam.update(3, &mut w, &array![0.0]);
        assert!(w[0] < 2.0);
    }
}
