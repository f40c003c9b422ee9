// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bias-corrected Adam moments.
//!
//! Ref: Kingma & Ba (2015), arXiv:1412.6980.

#[derive(Debug, Clone)]
pub(crate) struct Adam {
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
}

impl Adam {
    pub(crate) fn new(n_params: usize, lr: f64, beta1: f64, beta2: f64, eps: f64) -> Self {
        Self {
            m: vec![0.0; n_params],
            v: vec![0.0; n_params],
            t: 0,
            lr,
            beta1,
            beta2,
            eps,
        }
    }

    /// Default moments for network training.
    pub(crate) fn with_lr(n_params: usize, lr: f64) -> Self {
        Self::new(n_params, lr, 0.9, 0.999, 1e-8)
    }

    /// Move `params` along `sign · m̂ / (√v̂ + eps)`: `+1` ascends, `-1` descends.
    pub(crate) fn apply<'p, 'g>(
        &mut self,
        params: impl IntoIterator<Item = &'p mut f64>,
        grad: impl IntoIterator<Item = &'g f64>,
        sign: f64,
    ) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for (i, (p, g)) in params.into_iter().zip(grad).enumerate() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            *p += sign * self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_step_has_learning_rate_magnitude() {
        let mut adam = Adam::new(2, 0.1, 0.9, 0.99, 1e-8);
        let mut x = vec![0.0, 0.0];
        adam.apply(x.iter_mut(), [3.0, -0.5].iter(), 1.0);
        assert_relative_eq!(x[0], 0.1, epsilon = 1e-6);
        assert_relative_eq!(x[1], -0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_descends_quadratic() {
        let mut adam = Adam::with_lr(1, 0.05);
        let mut x = vec![2.0];
        for _ in 0..500 {
            let g = [2.0 * x[0]];
            adam.apply(x.iter_mut(), g.iter(), -1.0);
        }
        assert!(x[0].abs() < 0.05);
    }
}
