// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Parameterized dynamics producing `ρ` and `∂ρ` for the bounds engine.
//!
//! - [`Lindblad`]: master equation on a time grid, optional control pulses
//! - [`Kraus`]: single-step quantum channel
//!
//! Both implement [`Dynamics`], the stepwise interface the objective
//! adapter and the sequential (DDPG) optimizer drive.
//!
//! # Example
//!
//! ```ignore
//! use qubit_os_metrology::dynamics::{Decay, Lindblad};
//!
//! let dynamics = Lindblad::new(tspan, h0, vec![dh], vec![Decay::sigma_minus(0.1)])?;
//! let trajectory = dynamics.evolve(&rho0, None)?;
//! let (rho, drho) = (&trajectory.rho[k], &trajectory.drho[k]);
//! ```

pub mod kraus;
pub mod lindblad;
pub mod types;

pub use kraus::Kraus;
pub use lindblad::{lindblad_rhs, Lindblad};
pub use types::{Decay, DynamicsState, Trajectory};

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::Result;
use crate::validation::validate_control_pulses;

/// Stepwise evolution of a density matrix and its parameter derivatives.
pub trait Dynamics {
    /// Hilbert-space dimension.
    fn dim(&self) -> usize;

    /// Number of estimated parameters.
    fn param_num(&self) -> usize;

    /// Number of propagation steps (control intervals).
    fn steps(&self) -> usize;

    /// Number of control channels.
    fn ctrl_num(&self) -> usize {
        0
    }

    /// State at the start of the evolution: `∂ρ(t0) = 0`.
    fn initial(&self, rho0: &Array2<Complex64>) -> DynamicsState {
        DynamicsState::fixed(rho0.clone(), self.param_num())
    }

    /// Advance by step `k` under the given control amplitudes.
    fn step(&self, state: &DynamicsState, k: usize, controls: &[f64]) -> Result<DynamicsState>;

    /// Evolve to the final time. `pulses` is `ctrl_num × steps`.
    fn evolve_final(&self, rho0: &Array2<Complex64>, pulses: Option<&Array2<f64>>) -> Result<DynamicsState> {
        if let Some(p) = pulses {
            validate_control_pulses(p, self.ctrl_num(), self.steps(), (f64::NEG_INFINITY, f64::INFINITY))?;
        }
        let mut state = self.initial(rho0);
        for k in 0..self.steps() {
            let controls = match pulses {
                Some(p) => p.column(k).to_vec(),
                None => vec![0.0; self.ctrl_num()],
            };
            state = self.step(&state, k, &controls)?;
        }
        Ok(state)
    }
}
