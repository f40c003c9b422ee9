// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for states, derivatives, measurements and controls.

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::{Result, ValidationError};
use crate::linalg::{eigh, hermiticity_error, trace};

fn check_square(what: &str, m: &Array2<Complex64>) -> Result<usize> {
    let (rows, cols) = m.dim();
    if rows != cols || rows == 0 {
        return Err(ValidationError::DimensionMismatch {
            what: what.into(),
            expected: "non-empty square matrix".into(),
            actual: format!("{} × {}", rows, cols),
        }
        .into());
    }
    Ok(rows)
}

fn check_shape(what: &str, m: &Array2<Complex64>, dim: usize) -> Result<()> {
    if m.dim() != (dim, dim) {
        return Err(ValidationError::DimensionMismatch {
            what: what.into(),
            expected: format!("{} × {}", dim, dim),
            actual: format!("{} × {}", m.nrows(), m.ncols()),
        }
        .into());
    }
    if m.iter().any(|z| !z.is_finite()) {
        return Err(ValidationError::Field {
            field: what.into(),
            message: "contains NaN or Inf".into(),
        }
        .into());
    }
    Ok(())
}

/// Validate a density matrix: square, Hermitian, unit trace, PSD.
pub fn validate_density_matrix(rho: &Array2<Complex64>, tol: f64) -> Result<()> {
    let dim = check_square("rho", rho)?;
    check_shape("rho", rho, dim)?;

    let herm = hermiticity_error(rho);
    if herm > tol {
        return Err(ValidationError::PhysicsConstraint(format!(
            "rho is not Hermitian (max deviation {:.3e})",
            herm
        ))
        .into());
    }

    let tr = trace(rho);
    if (tr.re - 1.0).abs() > tol || tr.im.abs() > tol {
        return Err(ValidationError::PhysicsConstraint(format!(
            "Tr(rho) = {:.6} + {:.6}i, expected 1",
            tr.re, tr.im
        ))
        .into());
    }

    let eig = eigh(rho)?;
    let min = eig.values.iter().cloned().fold(f64::INFINITY, f64::min);
    if min < -tol {
        return Err(ValidationError::PhysicsConstraint(format!(
            "rho has negative eigenvalue {:.3e}",
            min
        ))
        .into());
    }
    Ok(())
}

/// Validate parameter derivatives against a density matrix.
///
/// Returns the Hilbert-space dimension.
pub fn validate_derivatives(rho: &Array2<Complex64>, drho: &[Array2<Complex64>]) -> Result<usize> {
    let dim = check_square("rho", rho)?;
    if drho.is_empty() {
        return Err(ValidationError::Field {
            field: "drho".into(),
            message: "at least one parameter derivative is required".into(),
        }
        .into());
    }
    for (k, d) in drho.iter().enumerate() {
        check_shape(&format!("drho[{}]", k), d, dim)?;
    }
    Ok(dim)
}

/// Validate the shapes of POVM elements without checking completeness.
pub fn validate_povm_shapes(dim: usize, povm: &[Array2<Complex64>]) -> Result<()> {
    if povm.is_empty() {
        return Err(ValidationError::Field {
            field: "M".into(),
            message: "POVM must contain at least one element".into(),
        }
        .into());
    }
    for (k, m) in povm.iter().enumerate() {
        check_shape(&format!("M[{}]", k), m, dim)?;
    }
    Ok(())
}

/// Validate a POVM: matching dimension, Hermitian elements, `Σ M = I`.
pub fn validate_povm(rho: &Array2<Complex64>, povm: &[Array2<Complex64>], tol: f64) -> Result<()> {
    let dim = check_square("rho", rho)?;
    validate_povm_shapes(dim, povm)?;

    let mut sum = Array2::<Complex64>::zeros((dim, dim));
    for (k, m) in povm.iter().enumerate() {
        if hermiticity_error(m) > tol {
            return Err(ValidationError::PhysicsConstraint(format!(
                "M[{}] is not Hermitian",
                k
            ))
            .into());
        }
        sum = sum + m;
    }
    for i in 0..dim {
        sum[[i, i]] -= Complex64::new(1.0, 0.0);
    }
    let err = sum.iter().map(|z| z.norm()).fold(0.0, f64::max);
    if err > tol {
        return Err(ValidationError::PhysicsConstraint(format!(
            "POVM elements do not sum to identity (max deviation {:.3e})",
            err
        ))
        .into());
    }
    Ok(())
}

/// Validate a weight matrix for `P` parameters: `P × P`, finite, symmetric.
pub fn validate_weight(w: &Array2<f64>, param_num: usize) -> Result<()> {
    if w.dim() != (param_num, param_num) {
        return Err(ValidationError::DimensionMismatch {
            what: "W".into(),
            expected: format!("{} × {}", param_num, param_num),
            actual: format!("{} × {}", w.nrows(), w.ncols()),
        }
        .into());
    }
    if w.iter().any(|x| !x.is_finite()) {
        return Err(ValidationError::Field {
            field: "W".into(),
            message: "contains NaN or Inf".into(),
        }
        .into());
    }
    for i in 0..param_num {
        for j in (i + 1)..param_num {
            if (w[[i, j]] - w[[j, i]]).abs() > 1e-10 {
                return Err(ValidationError::Field {
                    field: "W".into(),
                    message: format!("not symmetric at ({}, {})", i, j),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Validate a control pulse matrix (`ctrl_num × steps`) against its bound.
pub fn validate_control_pulses(
    pulses: &Array2<f64>,
    ctrl_num: usize,
    steps: usize,
    bound: (f64, f64),
) -> Result<()> {
    if pulses.dim() != (ctrl_num, steps) {
        return Err(ValidationError::DimensionMismatch {
            what: "control pulses".into(),
            expected: format!("{} × {}", ctrl_num, steps),
            actual: format!("{} × {}", pulses.nrows(), pulses.ncols()),
        }
        .into());
    }
    for ((j, k), val) in pulses.indexed_iter() {
        if val.is_nan() {
            return Err(ValidationError::Field {
                field: format!("ctrl[{}]", j),
                message: format!("contains NaN at index {}", k),
            }
            .into());
        }
        if *val < bound.0 || *val > bound.1 {
            return Err(ValidationError::Field {
                field: format!("ctrl[{}]", j),
                message: format!(
                    "amplitude {} at index {} outside [{}, {}]",
                    val, k, bound.0, bound.1
                ),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::linalg::c;
    use crate::test_utils::{pauli_x, random_density_matrix, random_povm};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_validate_density_matrix() {
        let mut rng = StdRng::seed_from_u64(3);
        let rho = random_density_matrix(3, &mut rng);
        assert!(validate_density_matrix(&rho, 1e-10).is_ok());

        // Not unit trace
        let scaled = &rho * c(2.0);
        assert!(validate_density_matrix(&scaled, 1e-10).is_err());

        // Traceless Hermitian but not PSD
        let mut bad = pauli_x();
        bad[[0, 0]] = c(0.5);
        bad[[1, 1]] = c(0.5);
        assert!(validate_density_matrix(&bad, 1e-10).is_err());

        // Non-square
        let rect = Array2::<Complex64>::zeros((2, 3));
        assert!(validate_density_matrix(&rect, 1e-10).is_err());
    }

    #[test]
    fn test_validate_derivatives() {
        let rho = Array2::from_diag_elem(2, c(0.5));
        assert!(validate_derivatives(&rho, &[pauli_x()]).is_ok());

        let err = validate_derivatives(&rho, &[]).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::Field { .. })));

        let wrong = Array2::<Complex64>::zeros((3, 3));
        let err = validate_derivatives(&rho, &[pauli_x(), wrong]).unwrap_err();
        assert!(err.to_string().contains("drho[1]"));
    }

    #[test]
    fn test_validate_povm() {
        let mut rng = StdRng::seed_from_u64(11);
        let rho = random_density_matrix(2, &mut rng);
        let povm = random_povm(2, 4, &mut rng);
        assert!(validate_povm(&rho, &povm, 1e-8).is_ok());

        // Incomplete
        assert!(validate_povm(&rho, &povm[..3], 1e-8).is_err());

        // Empty
        assert!(validate_povm(&rho, &[], 1e-8).is_err());
    }

    #[test]
    fn test_validate_weight() {
        let w = Array2::<f64>::eye(2);
        assert!(validate_weight(&w, 2).is_ok());
        assert!(validate_weight(&w, 3).is_err());

        let mut asym = Array2::<f64>::eye(2);
        asym[[0, 1]] = 0.3;
        assert!(validate_weight(&asym, 2).is_err());
    }

    #[test]
    fn test_validate_control_pulses() {
        let pulses = Array2::<f64>::zeros((2, 10));
        assert!(validate_control_pulses(&pulses, 2, 10, (-1.0, 1.0)).is_ok());
        assert!(validate_control_pulses(&pulses, 2, 9, (-1.0, 1.0)).is_err());

        let mut bad = pulses.clone();
        bad[[1, 4]] = f64::NAN;
        assert!(validate_control_pulses(&bad, 2, 10, (-1.0, 1.0)).is_err());

        let mut big = pulses;
        big[[0, 0]] = 2.0;
        assert!(validate_control_pulses(&big, 2, 10, (-1.0, 1.0)).is_err());
    }
}
