// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hermitian eigendecomposition and small real-matrix helpers.
//!
//! The eigensolver delegates to faer's self-adjoint decomposition; only the
//! lower triangle is read, so inputs are Hermitized first to keep the result
//! independent of which triangle carries rounding noise.

use faer::complex_native::c64;
use faer::{Mat, Side};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::NumericalError;

/// Eigenvalues (ascending) and eigenvectors (columns) of a Hermitian matrix.
#[derive(Debug, Clone)]
pub struct HermitianEigen {
    /// Real eigenvalues in ascending order.
    pub values: Array1<f64>,
    /// Unitary matrix whose k-th column is the eigenvector of `values[k]`.
    pub vectors: Array2<Complex64>,
}

impl HermitianEigen {
    /// The k-th eigenvector as an owned column.
    pub fn vector(&self, k: usize) -> Array1<Complex64> {
        self.vectors.column(k).to_owned()
    }

    /// Rotate an operator into the eigenbasis: V† A V.
    pub fn to_eigenbasis(&self, a: &Array2<Complex64>) -> Array2<Complex64> {
        super::dagger(&self.vectors).dot(a).dot(&self.vectors)
    }

    /// Rotate an operator back out of the eigenbasis: V A V†.
    pub fn from_eigenbasis(&self, a: &Array2<Complex64>) -> Array2<Complex64> {
        self.vectors.dot(a).dot(&super::dagger(&self.vectors))
    }
}

/// Eigendecomposition of a Hermitian matrix.
///
/// # Errors
/// `EigenDecomposition` if the matrix is not square or the solver returns
/// non-finite values.
pub fn eigh(a: &Array2<Complex64>) -> Result<HermitianEigen, NumericalError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(NumericalError::EigenDecomposition(format!(
            "matrix must be square, got {} × {}",
            n,
            a.ncols()
        )));
    }
    if n == 0 {
        return Ok(HermitianEigen {
            values: Array1::zeros(0),
            vectors: Array2::zeros((0, 0)),
        });
    }

    let mat = Mat::<c64>::from_fn(n, n, |i, j| {
        let z = (a[[i, j]] + a[[j, i]].conj()) * 0.5;
        c64::new(z.re, z.im)
    });

    let decomposition = mat.selfadjoint_eigendecomposition(Side::Lower);
    let s = decomposition.s().column_vector();
    let u = decomposition.u();

    let values: Array1<f64> = (0..n).map(|i| s.read(i).re).collect();
    let vectors = Array2::from_shape_fn((n, n), |(i, j)| {
        let z = u.read(i, j);
        Complex64::new(z.re, z.im)
    });

    if values.iter().any(|v| !v.is_finite()) || vectors.iter().any(|z| !z.is_finite()) {
        return Err(NumericalError::EigenDecomposition(
            "solver did not converge to finite eigenpairs".into(),
        ));
    }

    Ok(HermitianEigen { values, vectors })
}

/// Inverse of a real square matrix via Gauss-Jordan elimination with
/// partial pivoting.
///
/// # Errors
/// `SingularMatrix` when a pivot falls below `1e-12` relative to the
/// largest entry of the input.
pub fn inverse_real(a: &Array2<f64>) -> Result<Array2<f64>, NumericalError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(NumericalError::SingularMatrix(format!(
            "cannot invert non-square {} × {} matrix",
            n,
            a.ncols()
        )));
    }
    if a.iter().any(|x| !x.is_finite()) {
        return Err(NumericalError::NonFinite("matrix to invert".into()));
    }

    let scale = a.iter().fold(0.0f64, |m, x| m.max(x.abs())).max(1e-300);
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            let val = aug[[row, col]].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        if max_val < 1e-12 * scale {
            return Err(NumericalError::SingularMatrix(format!(
                "pivot {:.3e} in column {}",
                max_val, col
            )));
        }
        if max_row != col {
            for j in 0..(2 * n) {
                aug.swap([col, j], [max_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..(2 * n) {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..(2 * n) {
                let val = aug[[col, j]];
                aug[[row, j]] -= factor * val;
            }
        }
    }

    Ok(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Principal square root of a real symmetric positive-semidefinite matrix.
///
/// Negative eigenvalues from rounding are clamped to zero.
pub fn sqrt_psd(a: &Array2<f64>) -> Result<Array2<f64>, NumericalError> {
    let eig = eigh(&super::complexify(a))?;
    let n = a.nrows();
    let mut root = Array2::<Complex64>::zeros((n, n));
    for k in 0..n {
        let s = eig.values[k].max(0.0).sqrt();
        if s == 0.0 {
            continue;
        }
        let v = eig.vector(k);
        root = root + super::ket_bra(&v, &v) * super::c(s);
    }
    Ok(root.mapv(|z| z.re))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{c, dagger, identity};
    use crate::test_utils::{pauli_x, pauli_y, random_density_matrix};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_eigh_pauli_x() {
        let eig = eigh(&pauli_x()).unwrap();
        assert_relative_eq!(eig.values[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(eig.values[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eigh_reconstructs_matrix() {
        let mut rng = StdRng::seed_from_u64(7);
        let rho = random_density_matrix(4, &mut rng);
        let eig = eigh(&rho).unwrap();

        let diag = Array2::from_diag(&eig.values.mapv(c));
        let rebuilt = eig.from_eigenbasis(&diag);
        for (a, b) in rebuilt.iter().zip(rho.iter()) {
            assert!((a - b).norm() < 1e-10);
        }

        // Eigenvectors are orthonormal
        let gram = dagger(&eig.vectors).dot(&eig.vectors);
        for (a, b) in gram.iter().zip(identity(4).iter()) {
            assert!((a - b).norm() < 1e-10);
        }
    }

    #[test]
    fn test_eigh_complex_hermitian() {
        let h = pauli_x() * c(0.5) + pauli_y() * c(0.5);
        let eig = eigh(&h).unwrap();
        let r = (0.5f64).sqrt();
        assert_relative_eq!(eig.values[0], -r, epsilon = 1e-12);
        assert_relative_eq!(eig.values[1], r, epsilon = 1e-12);
    }

    #[test]
    fn test_eigh_rejects_non_square() {
        let m = Array2::<Complex64>::zeros((2, 3));
        assert!(eigh(&m).is_err());
    }

    #[test]
    fn test_inverse_real() {
        let a = ndarray::arr2(&[[4.0, 1.0], [2.0, 3.0]]);
        let inv = inverse_real(&a).unwrap();
        let prod = a.dot(&inv);
        assert_relative_eq!(prod[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(prod[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(prod[[1, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(prod[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_singular_is_error() {
        let a = ndarray::arr2(&[[1.0, 2.0], [2.0, 4.0]]);
        let err = inverse_real(&a).unwrap_err();
        assert!(matches!(err, NumericalError::SingularMatrix(_)));
    }

    #[test]
    fn test_sqrt_psd() {
        let a = ndarray::arr2(&[[2.0, 1.0], [1.0, 2.0]]);
        let root = sqrt_psd(&a).unwrap();
        let sq = root.dot(&root);
        for (x, y) in sq.iter().zip(a.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-10);
        }
    }
}
