// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense complex linear algebra shared by the bounds engine, the dynamics
//! propagators and the optimizers.
//!
//! - [`eigh`]: Hermitian eigendecomposition (faer)
//! - [`matrix_exp`]: Matrix exponential via scaling-and-squaring + Padé(13)
//! - [`su_n_generators`]: Generalized Gell-Mann basis
//! - [`gram_schmidt`]: Orthonormalization of complex vectors
//! - [`vectorize`] / [`unvectorize`]: Row-major `vec(A)` and its inverse

pub mod basis;
pub mod eigen;
pub mod expm;

pub use basis::{gram_schmidt, su_n_generators, unvectorize, vectorize};
pub use eigen::{eigh, inverse_real, sqrt_psd, HermitianEigen};
pub use expm::matrix_exp;

use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Complex zero.
pub const ZERO: Complex64 = Complex64 { re: 0.0, im: 0.0 };
/// Complex one.
pub const ONE: Complex64 = Complex64 { re: 1.0, im: 0.0 };
/// Imaginary unit.
pub const I: Complex64 = Complex64 { re: 0.0, im: 1.0 };

/// Helper: create Complex64 from f64
#[inline]
pub fn c(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

/// d × d identity.
pub fn identity(d: usize) -> Array2<Complex64> {
    Array2::from_diag_elem(d, ONE)
}

/// Conjugate transpose (dagger) of a matrix.
pub fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|z| z.conj())
}

/// Trace of a square matrix.
pub fn trace(m: &Array2<Complex64>) -> Complex64 {
    m.diag().sum()
}

/// Tr(A·B) without forming the product.
pub fn trace_product(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Complex64 {
    let n = a.nrows();
    let mut tr = ZERO;
    for i in 0..n {
        for k in 0..a.ncols() {
            tr += a[[i, k]] * b[[k, i]];
        }
    }
    tr
}

/// [A, B] = AB − BA
pub fn commutator(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    a.dot(b) - b.dot(a)
}

/// {A, B} = AB + BA
pub fn anticommutator(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    a.dot(b) + b.dot(a)
}

/// Outer product |u⟩⟨v|.
pub fn ket_bra(u: &Array1<Complex64>, v: &Array1<Complex64>) -> Array2<Complex64> {
    let n = u.len();
    let m = v.len();
    Array2::from_shape_fn((n, m), |(i, j)| u[i] * v[j].conj())
}

/// Euclidean norm of a complex vector.
pub fn norm(v: &Array1<Complex64>) -> f64 {
    v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt()
}

/// Largest absolute deviation from Hermiticity.
pub fn hermiticity_error(m: &Array2<Complex64>) -> f64 {
    let n = m.nrows();
    let mut max_err = 0.0f64;
    for i in 0..n {
        for j in i..n {
            max_err = max_err.max((m[[i, j]] - m[[j, i]].conj()).norm());
        }
    }
    max_err
}

/// Promote a real matrix to a complex one.
pub fn complexify(m: &Array2<f64>) -> Array2<Complex64> {
    m.mapv(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{pauli_x, pauli_y, pauli_z};
    use approx::assert_relative_eq;

    #[test]
    fn test_pauli_commutator() {
        // [σx, σy] = 2iσz
        let comm = commutator(&pauli_x(), &pauli_y());
        let expected = pauli_z() * Complex64::new(0.0, 2.0);
        for (a, b) in comm.iter().zip(expected.iter()) {
            assert!((a - b).norm() < 1e-14);
        }
    }

    #[test]
    fn test_pauli_anticommutator_vanishes() {
        let acomm = anticommutator(&pauli_x(), &pauli_z());
        assert!(acomm.iter().all(|z| z.norm() < 1e-14));
    }

    #[test]
    fn test_trace_product_matches_dot() {
        let a = pauli_x() + pauli_z() * c(0.3);
        let b = pauli_y() * c(0.7) + identity(2);
        let direct = trace(&a.dot(&b));
        let fast = trace_product(&a, &b);
        assert_relative_eq!(direct.re, fast.re, epsilon = 1e-14);
        assert_relative_eq!(direct.im, fast.im, epsilon = 1e-14);
    }

    #[test]
    fn test_ket_bra_projector() {
        let v = Array1::from(vec![c(1.0 / 2f64.sqrt()), Complex64::new(0.0, 1.0 / 2f64.sqrt())]);
        let p = ket_bra(&v, &v);
        assert_relative_eq!(trace(&p).re, 1.0, epsilon = 1e-14);
        assert!(hermiticity_error(&p) < 1e-14);
        let p2 = p.dot(&p);
        for (a, b) in p2.iter().zip(p.iter()) {
            assert!((a - b).norm() < 1e-14);
        }
    }

    #[test]
    fn test_dagger() {
        let mut m = Array2::zeros((2, 2));
        m[[0, 1]] = Complex64::new(1.0, 2.0);
        m[[1, 0]] = Complex64::new(3.0, 4.0);
        let dag = dagger(&m);
        assert_eq!(dag[[0, 1]], Complex64::new(3.0, -4.0));
        assert_eq!(dag[[1, 0]], Complex64::new(1.0, -2.0));
    }
}
