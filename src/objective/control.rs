// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Control objective: pulses `ctrl_num × steps` drive the dynamics from a
//! fixed initial state. Also serves as the stepwise DDPG environment.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::{debug, trace};

use super::{BoundEvaluator, BoundKind, Objective, ObjectiveOptions, SequentialEnvironment};
use crate::dynamics::{Dynamics, DynamicsState};
use crate::error::{Error, Result, ValidationError};
use crate::optimize::{Candidate, SearchSpace};
use crate::validation::validate_density_matrix;

pub struct ControlObjective<D> {
    dynamics: D,
    rho0: Array2<Complex64>,
    evaluator: BoundEvaluator,
    space: SearchSpace,
}

impl<D: Dynamics> ControlObjective<D> {
    /// `bound` clamps every amplitude; use `(-inf, inf)` for none.
    pub fn new(
        dynamics: D,
        rho0: Array2<Complex64>,
        kind: BoundKind,
        bound: (f64, f64),
        options: ObjectiveOptions,
    ) -> Result<Self> {
        let ctrl_num = dynamics.ctrl_num();
        if ctrl_num == 0 {
            return Err(Error::Config(
                "control optimization requires at least one control Hamiltonian".into(),
            ));
        }
        if bound.0.is_nan() || bound.1.is_nan() || bound.0 > bound.1 {
            return Err(Error::Config(format!(
                "control bound [{}, {}] is empty",
                bound.0, bound.1
            )));
        }
        let dim = dynamics.dim();
        if rho0.dim() != (dim, dim) {
            return Err(ValidationError::DimensionMismatch {
                what: "rho0".into(),
                expected: format!("{} × {}", dim, dim),
                actual: format!("{} × {}", rho0.nrows(), rho0.ncols()),
            }
            .into());
        }
        validate_density_matrix(&rho0, 1e-8)?;

        let evaluator = BoundEvaluator::new(kind, dim, dynamics.param_num(), options)?;
        let steps = dynamics.steps();
        debug!(ctrl_num, steps, bound = %kind, "Control objective ready");
        Ok(Self {
            dynamics,
            rho0,
            evaluator,
            space: SearchSpace::Control { ctrl_num, steps, bound },
        })
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }
}

impl<D: Dynamics> Objective for ControlObjective<D> {
    fn space(&self) -> &SearchSpace {
        &self.space
    }

    fn bound(&self) -> BoundKind {
        self.evaluator.kind()
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let Candidate::Control(pulses) = self.space.decode(x)? else {
            return Err(ValidationError::Field {
                field: "x".into(),
                message: "expected control pulses".into(),
            }
            .into());
        };
        let out = self.dynamics.evolve_final(&self.rho0, Some(&pulses))?;
        self.evaluator.value(&out.rho, &out.drho)
    }

    fn sequential(&self) -> Option<&dyn SequentialEnvironment> {
        Some(self)
    }
}

impl<D: Dynamics> SequentialEnvironment for ControlObjective<D> {
    fn steps(&self) -> usize {
        self.dynamics.steps()
    }

    fn ctrl_num(&self) -> usize {
        self.dynamics.ctrl_num()
    }

    fn control_bound(&self) -> (f64, f64) {
        match self.space {
            SearchSpace::Control { bound, .. } => bound,
            _ => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    fn observation_dim(&self) -> usize {
        let d = self.dynamics.dim();
        2 * d * d + 1
    }

    fn reset(&self) -> DynamicsState {
        self.dynamics.initial(&self.rho0)
    }

    /// Real and imaginary parts of `ρ`, then the elapsed fraction of steps.
    fn observe(&self, state: &DynamicsState, k: usize) -> Vec<f64> {
        let mut obs: Vec<f64> = state.rho.iter().flat_map(|z| [z.re, z.im]).collect();
        obs.push(k as f64 / self.dynamics.steps().max(1) as f64);
        obs
    }

    fn advance(&self, state: &DynamicsState, k: usize, controls: &[f64]) -> Result<DynamicsState> {
        trace!(step = k, "Advancing control environment");
        self.dynamics.step(state, k, controls)
    }

    fn value(&self, state: &DynamicsState) -> Result<f64> {
        self.evaluator.value(&state.rho, &state.drho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::LdKind;
    use crate::dynamics::{Decay, Lindblad};
    use crate::linalg::c;
    use crate::test_utils::{pauli_x, pauli_z};
    use approx::assert_relative_eq;

    fn controlled(steps: usize) -> Lindblad {
        let tspan: Vec<f64> = (0..=steps).map(|k| k as f64 * 0.1).collect();
        Lindblad::new(
            tspan,
            pauli_z() * c(0.5),
            vec![pauli_z() * c(0.5)],
            vec![Decay::sigma_minus(0.05)],
        )
        .unwrap()
        .with_controls(vec![pauli_x() * c(0.5)])
        .unwrap()
    }

    fn plus() -> Array2<Complex64> {
        Array2::from_elem((2, 2), c(0.5))
    }

    #[test]
    fn test_evaluate_matches_stepwise_environment() {
        let objective = ControlObjective::new(
            controlled(8),
            plus(),
            BoundKind::Qfim(LdKind::Sld),
            (-1.0, 1.0),
            ObjectiveOptions::default(),
        )
        .unwrap();
        let x: Vec<f64> = (0..8).map(|k| 0.1 * k as f64 - 0.3).collect();
        let direct = objective.evaluate(&x).unwrap();

        let env = objective.sequential().unwrap();
        assert_eq!(env.steps(), 8);
        assert_eq!(env.observation_dim(), 9);
        let mut state = env.reset();
        for (k, u) in x.iter().enumerate() {
            state = env.advance(&state, k, &[*u]).unwrap();
        }
        assert_relative_eq!(env.value(&state).unwrap(), direct, epsilon = 1e-10);
    }

    #[test]
    fn test_zero_controls_match_free_evolution() {
        let objective = ControlObjective::new(
            controlled(5),
            plus(),
            BoundKind::Qfim(LdKind::Sld),
            (f64::NEG_INFINITY, f64::INFINITY),
            ObjectiveOptions::default(),
        )
        .unwrap();
        let controlled_value = objective.evaluate(&[0.0; 5]).unwrap();
        let free = objective.dynamics().evolve_final(&plus(), None).unwrap();
        let free_value = objective.value(&free).unwrap();
        assert_relative_eq!(controlled_value, free_value, epsilon = 1e-12);
    }

    #[test]
    fn test_requires_control_hamiltonians() {
        let tspan = vec![0.0, 0.1, 0.2];
        let dynamics = Lindblad::new(tspan, pauli_z() * c(0.5), vec![pauli_z() * c(0.5)], vec![]).unwrap();
        let err = ControlObjective::new(
            dynamics,
            plus(),
            BoundKind::Cfim,
            (-1.0, 1.0),
            ObjectiveOptions::default(),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("control Hamiltonian"));
    }

    #[test]
    fn test_rejects_empty_bound() {
        let result = ControlObjective::new(
            controlled(3),
            plus(),
            BoundKind::Cfim,
            (1.0, -1.0),
            ObjectiveOptions::default(),
        );
        assert!(result.is_err());
    }
}
