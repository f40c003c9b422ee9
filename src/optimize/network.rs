// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Small fully-connected networks for the DDPG actor and critic.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use super::adam::Adam;

/// Output nonlinearity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activation {
    Relu,
    Tanh,
    Linear,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }

    /// Derivative in terms of the pre-activation.
    fn derivative(self, x: f64) -> f64 {
        match self {
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => 1.0 - x.tanh().powi(2),
            Activation::Linear => 1.0,
        }
    }
}

/// Affine layer `y = W x + b`.
#[derive(Debug, Clone)]
pub(crate) struct Dense {
    w: Array2<f64>,
    b: Array1<f64>,
}

impl Dense {
    /// Xavier-uniform weights, zero bias.
    fn xavier(input: usize, output: usize, rng: &mut StdRng) -> Self {
        let scale = (6.0 / (input + output) as f64).sqrt();
        Self::uniform(input, output, scale, rng)
    }

    fn uniform(input: usize, output: usize, scale: f64, rng: &mut StdRng) -> Self {
        let w = Array2::from_shape_fn((output, input), |_| rng.gen_range(-scale..scale));
        Self {
            w,
            b: Array1::zeros(output),
        }
    }
}

/// Hidden ReLU layers followed by one output layer.
#[derive(Debug, Clone)]
pub(crate) struct Mlp {
    layers: Vec<Dense>,
    output: Activation,
}

/// Cached activations of one forward pass.
pub(crate) struct Forward {
    inputs: Vec<Array1<f64>>,
    pre: Vec<Array1<f64>>,
    pub(crate) output: Array1<f64>,
}

/// Accumulated parameter gradients, shaped like the network.
pub(crate) struct Gradients {
    w: Vec<Array2<f64>>,
    b: Vec<Array1<f64>>,
}

impl Gradients {
    pub(crate) fn scale(&mut self, factor: f64) {
        self.w.iter_mut().for_each(|g| *g *= factor);
        self.b.iter_mut().for_each(|g| *g *= factor);
    }
}

impl Mlp {
    /// `hidden_layers` layers of width `hidden`. The output layer starts
    /// near zero so early actions and values stay small.
    pub(crate) fn new(
        input: usize,
        hidden: usize,
        hidden_layers: usize,
        output: usize,
        activation: Activation,
        rng: &mut StdRng,
    ) -> Self {
        let mut layers = Vec::with_capacity(hidden_layers + 1);
        let mut fan_in = input;
        for _ in 0..hidden_layers {
            layers.push(Dense::xavier(fan_in, hidden, rng));
            fan_in = hidden;
        }
        layers.push(Dense::uniform(fan_in, output, 3e-3, rng));
        Self {
            layers,
            output: activation,
        }
    }

    fn activation(&self, layer: usize) -> Activation {
        if layer + 1 == self.layers.len() {
            self.output
        } else {
            Activation::Relu
        }
    }

    pub(crate) fn forward(&self, x: &Array1<f64>) -> Forward {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre = Vec::with_capacity(self.layers.len());
        let mut h = x.clone();
        for (l, layer) in self.layers.iter().enumerate() {
            let z = layer.w.dot(&h) + &layer.b;
            let act = self.activation(l);
            inputs.push(h);
            h = z.mapv(|v| act.apply(v));
            pre.push(z);
        }
        Forward {
            inputs,
            pre,
            output: h,
        }
    }

    pub(crate) fn predict(&self, x: &Array1<f64>) -> Array1<f64> {
        self.forward(x).output
    }

    pub(crate) fn zero_grad(&self) -> Gradients {
        Gradients {
            w: self.layers.iter().map(|l| Array2::zeros(l.w.raw_dim())).collect(),
            b: self.layers.iter().map(|l| Array1::zeros(l.b.raw_dim())).collect(),
        }
    }

    /// Backpropagate `∂L/∂output`. Parameter gradients are added to `grads`
    /// when given; the return value is `∂L/∂input`.
    pub(crate) fn backward(
        &self,
        fwd: &Forward,
        d_output: &Array1<f64>,
        mut grads: Option<&mut Gradients>,
    ) -> Array1<f64> {
        let mut g = d_output.clone();
        for l in (0..self.layers.len()).rev() {
            let act = self.activation(l);
            let delta = &g * &fwd.pre[l].mapv(|v| act.derivative(v));
            if let Some(grads) = grads.as_deref_mut() {
                let outer = delta
                    .view()
                    .insert_axis(Axis(1))
                    .dot(&fwd.inputs[l].view().insert_axis(Axis(0)));
                grads.w[l] += &outer;
                grads.b[l] += &delta;
            }
            g = self.layers[l].w.t().dot(&delta);
        }
        g
    }

    /// Polyak averaging: `θ ← τ θ_source + (1 − τ) θ`.
    pub(crate) fn soft_update(&mut self, source: &Mlp, tau: f64) {
        for (target, src) in self.layers.iter_mut().zip(source.layers.iter()) {
            target.w.zip_mut_with(&src.w, |t, s| *t = tau * s + (1.0 - tau) * *t);
            target.b.zip_mut_with(&src.b, |t, s| *t = tau * s + (1.0 - tau) * *t);
        }
    }
}

/// Adam state for every tensor of one network.
pub(crate) struct MlpAdam {
    w: Vec<Adam>,
    b: Vec<Adam>,
}

impl MlpAdam {
    pub(crate) fn new(net: &Mlp, lr: f64) -> Self {
        Self {
            w: net.layers.iter().map(|l| Adam::with_lr(l.w.len(), lr)).collect(),
            b: net.layers.iter().map(|l| Adam::with_lr(l.b.len(), lr)).collect(),
        }
    }

    /// Descend along `grads`.
    pub(crate) fn step(&mut self, net: &mut Mlp, grads: &Gradients) {
        for (l, layer) in net.layers.iter_mut().enumerate() {
            self.w[l].apply(layer.w.iter_mut(), grads.w[l].iter(), -1.0);
            self.b[l].apply(layer.b.iter_mut(), grads.b[l].iter(), -1.0);
        }
    }
}
