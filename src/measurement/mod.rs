// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! POVM parameterizations used as measurement-optimization candidates.
//!
//! Each parameterization decodes a flat real vector into a complete POVM:
//!
//! - [`MeasurementParam::Projective`]: `2d²` reals form `d` complex
//!   vectors, orthonormalized by Gram-Schmidt into rank-one projectors.
//! - [`MeasurementParam::LinearCombination`]: a column-stochastic
//!   `outcomes × n` matrix `B` mixes a fixed POVM, `M_i = Σ_j B_ij P_j`.
//! - [`MeasurementParam::Rotation`]: `d² − 1` angles define
//!   `U = exp(i Σ_a s_a λ_a)` and `M_i = U P_i U†`.

use std::f64::consts::PI;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Serialize;

use crate::error::{NumericalError, Result, ValidationError};
use crate::linalg::{c, dagger, gram_schmidt, identity, ket_bra, matrix_exp, su_n_generators, I};
use crate::validation::validate_povm;

/// Measurement parameterization.
#[derive(Debug, Clone)]
pub enum MeasurementParam {
    /// Rank-one projective measurement in an optimized orthonormal basis.
    Projective,
    /// Stochastic mixing of a fixed POVM into `outcomes` elements.
    LinearCombination {
        basis: Vec<Array2<Complex64>>,
        outcomes: usize,
    },
    /// Unitary rotation of a fixed POVM.
    Rotation { basis: Vec<Array2<Complex64>> },
}

/// A decoded measurement together with the parameters that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementCandidate {
    pub params: Vec<f64>,
    pub povm: Vec<Array2<Complex64>>,
}

impl MeasurementParam {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            MeasurementParam::Projective => "projection",
            MeasurementParam::LinearCombination { .. } => "LC",
            MeasurementParam::Rotation { .. } => "rotation",
        }
    }

    /// Check the fixed POVM of the LC and rotation forms.
    pub fn validate(&self, dim: usize) -> Result<()> {
        match self {
            MeasurementParam::Projective => Ok(()),
            MeasurementParam::LinearCombination { basis, outcomes } => {
                if *outcomes == 0 {
                    return Err(ValidationError::Field {
                        field: "outcomes".into(),
                        message: "must be greater than 0".into(),
                    }
                    .into());
                }
                validate_povm(&identity(dim), basis, 1e-8)
            }
            MeasurementParam::Rotation { basis } => validate_povm(&identity(dim), basis, 1e-8),
        }
    }

    /// Length of the real parameter vector for Hilbert dimension `dim`.
    pub fn dimension(&self, dim: usize) -> usize {
        match self {
            MeasurementParam::Projective => 2 * dim * dim,
            MeasurementParam::LinearCombination { basis, outcomes } => outcomes * basis.len(),
            MeasurementParam::Rotation { .. } => dim * dim - 1,
        }
    }

    /// Draw a random parameter vector.
    pub fn random(&self, dim: usize, rng: &mut StdRng) -> Vec<f64> {
        let n = self.dimension(dim);
        match self {
            MeasurementParam::Projective => (0..n).map(|_| rng.sample(StandardNormal)).collect(),
            MeasurementParam::LinearCombination { .. } => {
                let mut x: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
                self.project(&mut x);
                x
            }
            MeasurementParam::Rotation { .. } => (0..n).map(|_| rng.gen_range(-PI..PI)).collect(),
        }
    }

    /// Map a parameter vector back onto the feasible set in place.
    ///
    /// LC weights are clamped to be nonnegative and each column is
    /// normalized to sum to one; the other forms are unconstrained.
    pub fn project(&self, x: &mut [f64]) {
        if let MeasurementParam::LinearCombination { basis, outcomes } = self {
            let n = basis.len();
            for j in 0..n {
                let mut sum = 0.0;
                for i in 0..*outcomes {
                    let v = &mut x[i * n + j];
                    if !v.is_finite() || *v < 0.0 {
                        *v = 0.0;
                    }
                    sum += *v;
                }
                for i in 0..*outcomes {
                    x[i * n + j] = if sum > 0.0 {
                        x[i * n + j] / sum
                    } else {
                        1.0 / *outcomes as f64
                    };
                }
            }
        }
    }

    /// Decode a parameter vector into a POVM.
    ///
    /// # Errors
    /// `SingularMatrix` (recoverable) when projective vectors are linearly
    /// dependent.
    pub fn decode(&self, x: &[f64], dim: usize) -> Result<MeasurementCandidate> {
        let expected = self.dimension(dim);
        if x.len() != expected {
            return Err(ValidationError::DimensionMismatch {
                what: format!("{} measurement parameters", self.name()),
                expected: expected.to_string(),
                actual: x.len().to_string(),
            }
            .into());
        }

        let povm = match self {
            MeasurementParam::Projective => {
                let vectors: Vec<Array1<Complex64>> = (0..dim)
                    .map(|j| {
                        (0..dim)
                            .map(|i| {
                                let k = 2 * (j * dim + i);
                                Complex64::new(x[k], x[k + 1])
                            })
                            .collect()
                    })
                    .collect();
                gram_schmidt(&vectors)?
                    .iter()
                    .map(|v| ket_bra(v, v))
                    .collect()
            }
            MeasurementParam::LinearCombination { basis, outcomes } => {
                let mut w = x.to_vec();
                self.project(&mut w);
                let n = basis.len();
                (0..*outcomes)
                    .map(|i| {
                        let mut m = Array2::<Complex64>::zeros((dim, dim));
                        for (j, p) in basis.iter().enumerate() {
                            m.scaled_add(c(w[i * n + j]), p);
                        }
                        m
                    })
                    .collect()
            }
            MeasurementParam::Rotation { basis } => {
                let u = rotation_unitary(x, dim)?;
                let u_dag = dagger(&u);
                basis.iter().map(|p| u.dot(p).dot(&u_dag)).collect()
            }
        };

        Ok(MeasurementCandidate {
            params: x.to_vec(),
            povm,
        })
    }
}

/// `U = exp(i Σ_a s_a λ_a)` over the generalized Gell-Mann generators.
pub fn rotation_unitary(angles: &[f64], dim: usize) -> std::result::Result<Array2<Complex64>, NumericalError> {
    let mut h = Array2::<Complex64>::zeros((dim, dim));
    for (s, g) in angles.iter().zip(su_n_generators(dim).iter()) {
        h.scaled_add(c(*s), g);
    }
    matrix_exp(&(h * I))
}

/// Projectors onto the computational basis.
pub fn computational_basis(dim: usize) -> Vec<Array2<Complex64>> {
    (0..dim)
        .map(|k| {
            let mut m = Array2::zeros((dim, dim));
            m[[k, k]] = c(1.0);
            m
        })
        .collect()
}

impl MeasurementCandidate {
    /// Parameters of a projective measurement along the given vectors.
    pub fn from_projective_vectors(vectors: &[Array1<Complex64>]) -> Vec<f64> {
        vectors
            .iter()
            .flat_map(|v| v.iter().flat_map(|z| [z.re, z.im]).collect::<Vec<_>>())
            .collect()
    }
}
