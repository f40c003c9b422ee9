// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Matrix exponential via scaling-and-squaring with Padé(13) approximation.
//!
//! Implements the algorithm from:
//!   Higham (2005), "The Scaling and Squaring Method for the Matrix
//!   Exponential Revisited", SIAM J. Matrix Anal. Appl. 26(4), 1179.
//!
//! Used for unitary propagators, for Liouvillian superoperators (d² × d²)
//! and for the block-triangular generators whose exponential carries the
//! parameter derivative of a propagator in its off-diagonal block.

use ndarray::{s, Array2};
use num_complex::Complex64;

use super::{c, identity};
use crate::error::NumericalError;

/// theta_13 from Higham Table 10.2.
const THETA_13: f64 = 5.37;

/// Padé(13,13) approximation coefficients.
/// From Higham (2005), equation (10.33).
const PADE_COEFFS: [f64; 14] = [
    1.0,
    0.5,
    0.12,
    1.833_333_333_333_333_4e-2,
    1.992_753_623_188_405_8e-3,
    1.630_434_782_608_696e-4,
    1.035_196_687_401_6e-5,
    5.175_983_437_008_01e-7,
    2.043_151_356_652_5e-8,
    6.306_022_705_717_593e-10,
    1.483_770_048_404_14e-11,
    2.529_153_491_597_966e-13,
    2.810_170_546_219_962_4e-15,
    1.544_049_750_670_309e-17,
];

/// Compute the matrix exponential exp(A).
///
/// # Errors
/// `NonFinite` if `A` contains NaN/inf, `SingularMatrix` if the Padé
/// denominator cannot be factored.
pub fn matrix_exp(a: &Array2<Complex64>) -> Result<Array2<Complex64>, NumericalError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(NumericalError::SingularMatrix(format!(
            "matrix_exp requires a square matrix, got {} × {}",
            n,
            a.ncols()
        )));
    }
    if a.iter().any(|z| !z.is_finite()) {
        return Err(NumericalError::NonFinite("matrix_exp input".into()));
    }

    match n {
        0 => return Ok(Array2::zeros((0, 0))),
        1 => return Ok(Array2::from_elem((1, 1), a[[0, 0]].exp())),
        _ => {}
    }

    let norm = matrix_1_norm(a);
    let squarings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as i32
    } else {
        0
    };

    let a_scaled = a * c(0.5f64.powi(squarings));
    let mut result = pade13(&a_scaled)?;

    // exp(A) = (exp(A/2^s))^(2^s)
    for _ in 0..squarings {
        result = result.dot(&result);
    }
    Ok(result)
}

/// Padé(13,13) approximation of exp(A) for ‖A‖₁ ≤ θ₁₃.
fn pade13(a: &Array2<Complex64>) -> Result<Array2<Complex64>, NumericalError> {
    let b = |k: usize| c(PADE_COEFFS[k]);
    let eye = identity(a.nrows());

    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    // U = A·[A6(b13 A6 + b11 A4 + b9 A2) + b7 A6 + b5 A4 + b3 A2 + b1 I]
    let w1 = &a6 * b(13) + &a4 * b(11) + &a2 * b(9);
    let w2 = w1.dot(&a6) + &a6 * b(7) + &a4 * b(5) + &a2 * b(3) + &eye * b(1);
    let u = a.dot(&w2);

    // V = A6(b12 A6 + b10 A4 + b8 A2) + b6 A6 + b4 A4 + b2 A2 + b0 I
    let v1 = &a6 * b(12) + &a4 * b(10) + &a2 * b(8);
    let v = v1.dot(&a6) + &a6 * b(6) + &a4 * b(4) + &a2 * b(2) + &eye * b(0);

    // exp(A) ≈ (V − U)⁻¹ (V + U)
    solve_linear(&v - &u, &v + &u)
}

/// Solve A·X = B with Gaussian elimination and partial pivoting.
fn solve_linear(
    a: Array2<Complex64>,
    b: Array2<Complex64>,
) -> Result<Array2<Complex64>, NumericalError> {
    let n = a.nrows();
    let m = b.ncols();

    let mut aug = Array2::zeros((n, n + m));
    aug.slice_mut(s![.., ..n]).assign(&a);
    aug.slice_mut(s![.., n..]).assign(&b);

    for col in 0..n {
        let mut max_val = 0.0;
        let mut max_row = col;
        for row in col..n {
            let val = aug[[row, col]].norm();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        if max_val < 1e-15 {
            return Err(NumericalError::SingularMatrix(
                "Padé denominator is singular".into(),
            ));
        }
        if max_row != col {
            for j in 0..(n + m) {
                aug.swap([col, j], [max_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for row in (col + 1)..n {
            let factor = aug[[row, col]] / pivot;
            for j in col..(n + m) {
                let val = aug[[col, j]];
                aug[[row, j]] -= factor * val;
            }
        }
    }

    let mut x = Array2::<Complex64>::zeros((n, m));
    for row in (0..n).rev() {
        let pivot = aug[[row, row]];
        for j in 0..m {
            let mut sum = aug[[row, n + j]];
            for k in (row + 1)..n {
                sum -= aug[[row, k]] * x[[k, j]];
            }
            x[[row, j]] = sum / pivot;
        }
    }
    Ok(x)
}

/// 1-norm of a complex matrix: max column sum of absolute values.
fn matrix_1_norm(a: &Array2<Complex64>) -> f64 {
    a.columns()
        .into_iter()
        .map(|col| col.iter().map(|z| z.norm()).sum::<f64>())
        .fold(0.0, f64::max)
}
