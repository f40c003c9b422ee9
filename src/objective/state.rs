// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Probe-state objective: `|ψ⟩ → ρ0 = |ψ⟩⟨ψ| → dynamics → bound`.

use tracing::debug;

use super::{BoundEvaluator, BoundKind, Objective, ObjectiveOptions};
use crate::dynamics::Dynamics;
use crate::error::{Result, ValidationError};
use crate::linalg::ket_bra;
use crate::optimize::{Candidate, SearchSpace};

pub struct StateObjective<D> {
    dynamics: D,
    evaluator: BoundEvaluator,
    space: SearchSpace,
}

impl<D: Dynamics> StateObjective<D> {
    pub fn new(dynamics: D, bound: BoundKind, options: ObjectiveOptions) -> Result<Self> {
        let dim = dynamics.dim();
        let evaluator = BoundEvaluator::new(bound, dim, dynamics.param_num(), options)?;
        debug!(dim, params = dynamics.param_num(), bound = %bound, "State objective ready");
        Ok(Self {
            dynamics,
            evaluator,
            space: SearchSpace::State { dim },
        })
    }
}

impl<D: Dynamics> Objective for StateObjective<D> {
    fn space(&self) -> &SearchSpace {
        &self.space
    }

    fn bound(&self) -> BoundKind {
        self.evaluator.kind()
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let Candidate::State(psi) = self.space.decode(x)? else {
            return Err(ValidationError::Field {
                field: "x".into(),
                message: "expected a probe state".into(),
            }
            .into());
        };
        let rho0 = ket_bra(&psi, &psi);
        let out = self.dynamics.evolve_final(&rho0, None)?;
        self.evaluator.value(&out.rho, &out.drho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::LdKind;
    use crate::dynamics::{Decay, Lindblad};
    use crate::linalg::c;
    use crate::test_utils::pauli_z;
    use approx::assert_relative_eq;

    fn phase_dynamics(gamma: f64) -> Lindblad {
        let tspan: Vec<f64> = (0..=20).map(|k| k as f64 * 0.1).collect();
        let h0 = pauli_z() * c(0.5);
        let dh = vec![pauli_z() * c(0.5)];
        Lindblad::new(tspan, h0, dh, vec![Decay::dephasing(gamma)]).unwrap()
    }

    #[test]
    fn test_equator_state_is_optimal_for_phase() {
        let objective =
            StateObjective::new(phase_dynamics(0.0), BoundKind::Qfim(LdKind::Sld), ObjectiveOptions::default())
                .unwrap();
        let s = 1.0 / 2f64.sqrt();
        // |+⟩ accumulates t² = 4 at t = 2
        let plus = objective.evaluate(&[s, 0.0, s, 0.0]).unwrap();
        assert_relative_eq!(plus, 4.0, epsilon = 1e-8);
        // |0⟩ is insensitive to a phase
        let zero = objective.evaluate(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(zero.abs() < 1e-8);
    }

    #[test]
    fn test_unnormalized_input_is_normalized() {
        let objective =
            StateObjective::new(phase_dynamics(0.1), BoundKind::Qfim(LdKind::Sld), ObjectiveOptions::default())
                .unwrap();
        let a = objective.evaluate(&[1.0, 0.0, 1.0, 0.0]).unwrap();
        let b = objective.evaluate(&[3.0, 0.0, 3.0, 0.0]).unwrap();
        assert_relative_eq!(a, b, epsilon = 1e-12);
        assert!(objective.differentiable());
        assert!(objective.sequential().is_none());
    }

    #[test]
    fn test_gradient_vanishes_at_optimum() {
        let objective =
            StateObjective::new(phase_dynamics(0.0), BoundKind::Qfim(LdKind::Sld), ObjectiveOptions::default())
                .unwrap();
        let s = 1.0 / 2f64.sqrt();
        let grad = objective.gradient(&[s, 0.0, s, 0.0], 1e-5).unwrap();
        for g in grad {
            assert!(g.abs() < 1e-4);
        }
    }

    #[test]
    fn test_kraus_phase_channel() {
        use crate::dynamics::Kraus;
        use ndarray::Array2;
        use num_complex::Complex64;

        // K = diag(e^{-iθ/2}, e^{iθ/2}) at θ = 0.3
        let theta: f64 = 0.3;
        let phase = |s: f64| Complex64::from_polar(1.0, s * theta / 2.0);
        let mut k = Array2::zeros((2, 2));
        k[[0, 0]] = phase(-1.0);
        k[[1, 1]] = phase(1.0);
        let mut dk = Array2::zeros((2, 2));
        dk[[0, 0]] = Complex64::new(0.0, -0.5) * phase(-1.0);
        dk[[1, 1]] = Complex64::new(0.0, 0.5) * phase(1.0);
        let channel = Kraus::new(vec![k], vec![vec![dk]]).unwrap();

        let objective =
            StateObjective::new(channel, BoundKind::Qfim(LdKind::Sld), ObjectiveOptions::default()).unwrap();
        let s = 1.0 / 2f64.sqrt();
        assert_relative_eq!(objective.evaluate(&[s, 0.0, s, 0.0]).unwrap(), 1.0, epsilon = 1e-8);
        assert!(objective.evaluate(&[0.0, 0.0, 1.0, 0.0]).unwrap().abs() < 1e-8);
    }
}
