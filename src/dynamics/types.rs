// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dynamics types: collapse channels, propagated states, trajectories.
//!
//! Ref: Lindblad (1976), Commun. Math. Phys. 48, 119.
//! Ref: Gorini, Kossakowski, Sudarshan (1976), J. Math. Phys. 17, 821.

use ndarray::Array2;
use num_complex::Complex64;

use crate::linalg::c;

/// A Lindblad collapse (jump) operator with its rate.
///
/// Represents a single dissipation channel:
///   D[L](ρ) = γ (L ρ L† − ½{L†L, ρ})
#[derive(Debug, Clone)]
pub struct Decay {
    /// Operator matrix (d × d).
    pub operator: Array2<Complex64>,
    /// Decay rate γ ≥ 0.
    pub rate: f64,
}

impl Decay {
    pub fn new(operator: Array2<Complex64>, rate: f64) -> Self {
        Self { operator, rate }
    }

    /// Qubit lowering channel σ⁻ = |0⟩⟨1|.
    pub fn sigma_minus(rate: f64) -> Self {
        let mut m = Array2::zeros((2, 2));
        m[[0, 1]] = c(1.0);
        Self::new(m, rate)
    }

    /// Qubit raising channel σ⁺ = |1⟩⟨0|.
    pub fn sigma_plus(rate: f64) -> Self {
        let mut m = Array2::zeros((2, 2));
        m[[1, 0]] = c(1.0);
        Self::new(m, rate)
    }

    /// Qubit pure dephasing channel σz/2.
    pub fn dephasing(rate: f64) -> Self {
        let mut m = Array2::zeros((2, 2));
        m[[0, 0]] = c(0.5);
        m[[1, 1]] = c(-0.5);
        Self::new(m, rate)
    }
}

/// A density matrix together with its parameter derivatives.
#[derive(Debug, Clone)]
pub struct DynamicsState {
    pub rho: Array2<Complex64>,
    /// `drho[a] = ∂ρ/∂x_a`
    pub drho: Vec<Array2<Complex64>>,
}

impl DynamicsState {
    /// State with zero derivatives.
    pub fn fixed(rho: Array2<Complex64>, param_num: usize) -> Self {
        let d = rho.nrows();
        Self {
            drho: vec![Array2::zeros((d, d)); param_num],
            rho,
        }
    }
}

/// States and derivatives at every point of the time grid.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub rho: Vec<Array2<Complex64>>,
    /// `drho[k][a]`: derivative with respect to parameter `a` at `times[k]`.
    pub drho: Vec<Vec<Array2<Complex64>>>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.rho.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rho.is_empty()
    }

    pub(crate) fn push(&mut self, t: f64, state: &DynamicsState) {
        self.times.push(t);
        self.rho.push(state.rho.clone());
        self.drho.push(state.drho.clone());
    }

    /// State at the final time point.
    pub fn last(&self) -> Option<DynamicsState> {
        Some(DynamicsState {
            rho: self.rho.last()?.clone(),
            drho: self.drho.last()?.clone(),
        })
    }
}
