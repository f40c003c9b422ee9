// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Objective adapter: turns a search-space point into a scalar figure of
//! merit that optimizers maximize.
//!
//! The scalarization follows the precision bound in use:
//!
//! - one parameter: the Fisher information `F` itself
//! - several parameters: `1 / Tr(W F⁻¹)`
//! - Holevo bound: `1 / HCRB`
//!
//! A singular `F` is a recoverable fault: the optimizer values the
//! candidate as non-improving and moves on.

pub mod control;
pub mod measurement;
pub mod state;

pub use control::ControlObjective;
pub use measurement::MeasurementObjective;
pub use state::StateObjective;

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::bounds::{cfim, holevo_bound, qfim, Basis, Information, LdKind, DEFAULT_ACCURACY};
use crate::dynamics::DynamicsState;
use crate::error::{Error, NumericalError, Result, ValidationError};
use crate::linalg::{identity, inverse_real};
use crate::measurement::computational_basis;
use crate::optimize::SearchSpace;
use crate::validation::{validate_povm, validate_weight};

/// Precision bound an objective is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundKind {
    /// Quantum Fisher information from the given logarithmic derivative.
    Qfim(LdKind),
    /// Classical Fisher information of a POVM.
    Cfim,
    /// Holevo Cramér-Rao bound.
    Hcrb,
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundKind::Qfim(LdKind::Sld) => write!(f, "QFIM"),
            BoundKind::Qfim(kind) => write!(f, "QFIM({})", kind),
            BoundKind::Cfim => write!(f, "CFIM"),
            BoundKind::Hcrb => write!(f, "HCRB"),
        }
    }
}

impl FromStr for BoundKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "QFIM" | "QFI" => Ok(BoundKind::Qfim(LdKind::Sld)),
            "CFIM" | "CFI" => Ok(BoundKind::Cfim),
            "HCRB" => Ok(BoundKind::Hcrb),
            _ => Err(ValidationError::UnknownVariant {
                field: "objective".into(),
                value: s.into(),
                expected: "{QFIM, CFIM, HCRB}".into(),
            }),
        }
    }
}

/// Scalar objective over a search space.
pub trait Objective {
    fn space(&self) -> &SearchSpace;

    fn bound(&self) -> BoundKind;

    /// Figure of merit at `x` (larger is better).
    fn evaluate(&self, x: &[f64]) -> Result<f64>;

    /// Central-difference gradient with step `h`.
    fn gradient(&self, x: &[f64], h: f64) -> Result<Vec<f64>> {
        let mut probe = x.to_vec();
        let mut grad = vec![0.0; x.len()];
        for i in 0..x.len() {
            let orig = probe[i];
            probe[i] = orig + h;
            let up = self.evaluate(&probe)?;
            probe[i] = orig - h;
            let down = self.evaluate(&probe)?;
            probe[i] = orig;
            grad[i] = (up - down) / (2.0 * h);
        }
        Ok(grad)
    }

    /// Whether gradient methods may drive this objective.
    fn differentiable(&self) -> bool {
        self.bound() != BoundKind::Hcrb
    }

    /// Stepwise environment for sequential-control methods.
    fn sequential(&self) -> Option<&dyn SequentialEnvironment> {
        None
    }
}

/// Step-by-step view of a controlled evolution, driven by DDPG.
pub trait SequentialEnvironment {
    fn steps(&self) -> usize;

    fn ctrl_num(&self) -> usize;

    fn control_bound(&self) -> (f64, f64);

    /// Length of [`SequentialEnvironment::observe`] vectors.
    fn observation_dim(&self) -> usize;

    /// State before the first control step.
    fn reset(&self) -> DynamicsState;

    /// Real feature vector of `state` at step `k`.
    fn observe(&self, state: &DynamicsState, k: usize) -> Vec<f64>;

    /// Apply step `k` with the given amplitudes.
    fn advance(&self, state: &DynamicsState, k: usize, controls: &[f64]) -> Result<DynamicsState>;

    /// Figure of merit of an intermediate or final state.
    fn value(&self, state: &DynamicsState) -> Result<f64>;
}

/// Options shared by every objective.
#[derive(Debug, Clone)]
pub struct ObjectiveOptions {
    /// `P × P` weight matrix; identity when absent.
    pub weight: Option<Array2<f64>>,
    /// POVM for CFIM objectives; computational basis when absent.
    pub povm: Option<Vec<Array2<Complex64>>>,
    pub accuracy: f64,
}

impl Default for ObjectiveOptions {
    fn default() -> Self {
        Self {
            weight: None,
            povm: None,
            accuracy: DEFAULT_ACCURACY,
        }
    }
}

/// Evaluates one precision bound on `(ρ, ∂ρ)` and scalarizes it.
#[derive(Debug, Clone)]
pub struct BoundEvaluator {
    kind: BoundKind,
    weight: Array2<f64>,
    povm: Vec<Array2<Complex64>>,
    accuracy: f64,
}

impl BoundEvaluator {
    pub fn new(kind: BoundKind, dim: usize, param_num: usize, options: ObjectiveOptions) -> Result<Self> {
        if !(options.accuracy > 0.0) {
            return Err(Error::Config(format!(
                "accuracy must be positive, got {}",
                options.accuracy
            )));
        }
        let weight = match options.weight {
            Some(w) => {
                validate_weight(&w, param_num)?;
                w
            }
            None => Array2::eye(param_num),
        };
        let povm = match (kind, options.povm) {
            (BoundKind::Cfim, Some(povm)) => {
                validate_povm(&identity(dim), &povm, 1e-8)?;
                povm
            }
            (BoundKind::Cfim, None) => computational_basis(dim),
            _ => Vec::new(),
        };
        Ok(Self {
            kind,
            weight,
            povm,
            accuracy: options.accuracy,
        })
    }

    pub fn kind(&self) -> BoundKind {
        self.kind
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Scalar figure of merit of `(ρ, ∂ρ)`.
    pub fn value(&self, rho: &Array2<Complex64>, drho: &[Array2<Complex64>]) -> Result<f64> {
        self.value_with_povm(rho, drho, &self.povm)
    }

    /// Like [`BoundEvaluator::value`] but with an explicit POVM for CFIM.
    pub fn value_with_povm(
        &self,
        rho: &Array2<Complex64>,
        drho: &[Array2<Complex64>],
        povm: &[Array2<Complex64>],
    ) -> Result<f64> {
        match self.kind {
            BoundKind::Qfim(ld) => {
                scalarize(&qfim(rho, drho, ld, Basis::Original, self.accuracy)?, &self.weight)
            }
            BoundKind::Cfim => scalarize(&cfim(rho, drho, povm, self.accuracy)?, &self.weight),
            BoundKind::Hcrb => {
                let hcrb = holevo_bound(rho, drho, &self.weight, self.accuracy)?.value;
                if !hcrb.is_finite() {
                    return Err(NumericalError::NonFinite("Holevo bound".into()).into());
                }
                if hcrb <= 0.0 {
                    return Err(NumericalError::SingularMatrix(format!(
                        "Holevo bound is not positive ({:.3e})",
                        hcrb
                    ))
                    .into());
                }
                Ok(1.0 / hcrb)
            }
        }
    }
}

/// `F` for one parameter, `1 / Tr(W F⁻¹)` otherwise.
pub fn scalarize(info: &Information, weight: &Array2<f64>) -> Result<f64> {
    match info {
        Information::Scalar(f) => {
            if !f.is_finite() {
                return Err(NumericalError::NonFinite("Fisher information".into()).into());
            }
            Ok(*f)
        }
        Information::Matrix(f) => {
            if f.iter().any(|v| !v.is_finite()) {
                return Err(NumericalError::NonFinite("Fisher information matrix".into()).into());
            }
            let inv = inverse_real(f)?;
            let cost = weight.dot(&inv).diag().sum();
            if !(cost > 0.0) || !cost.is_finite() {
                return Err(NumericalError::SingularMatrix(format!(
                    "Tr(W F⁻¹) is not positive ({:.3e})",
                    cost
                ))
                .into());
            }
            Ok(1.0 / cost)
        }
    }
}
