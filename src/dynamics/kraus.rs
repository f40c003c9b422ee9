// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Parameterized quantum channel in Kraus form.
//!
//!   ρ' = Σ_i K_i ρ K_i†
//!   ∂_a ρ' = Σ_i (∂_a K_i ρ K_i† + K_i ∂_a ρ K_i† + K_i ρ ∂_a K_i†)

use ndarray::Array2;
use num_complex::Complex64;

use super::types::DynamicsState;
use super::Dynamics;
use crate::error::{Result, ValidationError};
use crate::linalg::{dagger, identity};

/// Completeness tolerance for `Σ K†K = I`.
const COMPLETENESS_TOL: f64 = 1e-6;

/// A single-step channel given by Kraus operators and their derivatives.
#[derive(Debug, Clone)]
pub struct Kraus {
    k: Vec<Array2<Complex64>>,
    /// `dk[i][a] = ∂K_i/∂x_a`
    dk: Vec<Vec<Array2<Complex64>>>,
}

impl Kraus {
    pub fn new(k: Vec<Array2<Complex64>>, dk: Vec<Vec<Array2<Complex64>>>) -> Result<Self> {
        let Some(first) = k.first() else {
            return Err(ValidationError::Field {
                field: "K".into(),
                message: "at least one Kraus operator is required".into(),
            }
            .into());
        };
        let d = first.nrows();
        if dk.len() != k.len() {
            return Err(ValidationError::DimensionMismatch {
                what: "dK".into(),
                expected: format!("{} entries (one per Kraus operator)", k.len()),
                actual: dk.len().to_string(),
            }
            .into());
        }
        let p = dk[0].len();
        if p == 0 {
            return Err(ValidationError::Field {
                field: "dK".into(),
                message: "at least one parameter derivative is required".into(),
            }
            .into());
        }

        let mut completeness = Array2::<Complex64>::zeros((d, d));
        for (i, (ki, dki)) in k.iter().zip(dk.iter()).enumerate() {
            if ki.dim() != (d, d) {
                return Err(ValidationError::DimensionMismatch {
                    what: format!("K[{}]", i),
                    expected: format!("{} × {}", d, d),
                    actual: format!("{} × {}", ki.nrows(), ki.ncols()),
                }
                .into());
            }
            if dki.len() != p {
                return Err(ValidationError::ParameterCount {
                    expected: p,
                    actual: dki.len(),
                }
                .into());
            }
            for (a, dka) in dki.iter().enumerate() {
                if dka.dim() != (d, d) {
                    return Err(ValidationError::DimensionMismatch {
                        what: format!("dK[{}][{}]", i, a),
                        expected: format!("{} × {}", d, d),
                        actual: format!("{} × {}", dka.nrows(), dka.ncols()),
                    }
                    .into());
                }
            }
            completeness = completeness + dagger(ki).dot(ki);
        }

        let err = (&completeness - &identity(d))
            .iter()
            .map(|z| z.norm())
            .fold(0.0, f64::max);
        if err > COMPLETENESS_TOL {
            return Err(ValidationError::PhysicsConstraint(format!(
                "Kraus operators are not trace preserving (max deviation {:.3e})",
                err
            ))
            .into());
        }

        Ok(Self { k, dk })
    }

    /// Apply the channel to a state and propagate its derivatives.
    pub fn apply(&self, state: &DynamicsState) -> DynamicsState {
        let d = state.rho.nrows();
        let mut rho = Array2::<Complex64>::zeros((d, d));
        let mut drho = vec![Array2::<Complex64>::zeros((d, d)); self.param_num()];

        for (ki, dki) in self.k.iter().zip(self.dk.iter()) {
            let ki_dag = dagger(ki);
            let ki_rho = ki.dot(&state.rho);
            rho = rho + ki_rho.dot(&ki_dag);
            for (a, dka) in dki.iter().enumerate() {
                let term = dka.dot(&state.rho).dot(&ki_dag)
                    + ki.dot(&state.drho[a]).dot(&ki_dag)
                    + ki_rho.dot(&dagger(dka));
                drho[a] = &drho[a] + &term;
            }
        }
        DynamicsState { rho, drho }
    }
}

impl Dynamics for Kraus {
    fn dim(&self) -> usize {
        self.k[0].nrows()
    }

    fn param_num(&self) -> usize {
        self.dk[0].len()
    }

    fn steps(&self) -> usize {
        1
    }

    fn step(&self, state: &DynamicsState, k: usize, _controls: &[f64]) -> Result<DynamicsState> {
        if k != 0 {
            return Err(ValidationError::Field {
                field: "step".into(),
                message: format!("a Kraus channel has a single step, got index {}", k),
            }
            .into());
        }
        Ok(self.apply(state))
    }
}
