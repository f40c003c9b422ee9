// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator bases and vector reshaping.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::{c, ZERO};
use crate::error::NumericalError;

/// Row-major vectorization: `vec(A)[i·d + j] = A[i, j]`.
///
/// With this convention `vec(A·X·B) = (A ⊗ Bᵀ)·vec(X)`.
pub fn vectorize(a: &Array2<Complex64>) -> Array1<Complex64> {
    a.iter().copied().collect()
}

/// Inverse of [`vectorize`] for a d² vector.
///
/// # Errors
/// `SingularMatrix` if the length is not a perfect square.
pub fn unvectorize(v: &Array1<Complex64>) -> Result<Array2<Complex64>, NumericalError> {
    let d = (v.len() as f64).sqrt().round() as usize;
    if d * d != v.len() {
        return Err(NumericalError::SingularMatrix(format!(
            "vector of length {} is not a vectorized square matrix",
            v.len()
        )));
    }
    Ok(Array2::from_shape_fn((d, d), |(i, j)| v[i * d + j]))
}

/// Modified Gram-Schmidt orthonormalization of complex vectors.
///
/// # Errors
/// `SingularMatrix` if a vector is linearly dependent on its predecessors.
pub fn gram_schmidt(vectors: &[Array1<Complex64>]) -> Result<Vec<Array1<Complex64>>, NumericalError> {
    let mut basis: Vec<Array1<Complex64>> = Vec::with_capacity(vectors.len());
    for (j, v) in vectors.iter().enumerate() {
        let mut q = v.clone();
        for e in &basis {
            let r: Complex64 = e.iter().zip(q.iter()).map(|(a, b)| a.conj() * b).sum();
            q = &q - &(e * r);
        }
        let nrm = super::norm(&q);
        if nrm < 1e-12 {
            return Err(NumericalError::SingularMatrix(format!(
                "vector {} is linearly dependent",
                j
            )));
        }
        basis.push(q.mapv(|z| z / nrm));
    }
    Ok(basis)
}

/// Generalized Gell-Mann generators of SU(n), normalized to
/// `Tr(λ_a λ_b) = 2 δ_ab`.
///
/// Ordering follows the block structure of the Gell-Mann matrices: the
/// first block holds (σx, σy, σz) on levels {0, 1}; block `b` appends `b`
/// symmetric/antisymmetric pairs followed by one diagonal generator.
/// Off-diagonal pairs are consumed in (i, j > i) row-major order.
pub fn su_n_generators(n: usize) -> Vec<Array2<Complex64>> {
    if n < 2 {
        return Vec::new();
    }

    let mut symmetric = Vec::new();
    let mut antisymmetric = Vec::new();
    for i in 0..n - 1 {
        for j in (i + 1)..n {
            let mut s = Array2::zeros((n, n));
            s[[i, j]] = c(1.0);
            s[[j, i]] = c(1.0);
            symmetric.push(s);

            let mut a = Array2::zeros((n, n));
            a[[i, j]] = Complex64::new(0.0, -1.0);
            a[[j, i]] = Complex64::new(0.0, 1.0);
            antisymmetric.push(a);
        }
    }

    let diagonal = diagonal_generators(n);

    let mut generators = Vec::with_capacity(n * n - 1);
    let mut pair = 0;
    let mut block = 1;
    for diag in diagonal {
        for _ in 0..block {
            if pair < symmetric.len() {
                generators.push(symmetric[pair].clone());
                generators.push(antisymmetric[pair].clone());
                pair += 1;
            }
        }
        generators.push(diag);
        block += 1;
    }
    generators
}

/// Traceless diagonal generators from Gram-Schmidt on diag(…, 1, −1, …).
fn diagonal_generators(n: usize) -> Vec<Array2<Complex64>> {
    let raw: Vec<Array1<Complex64>> = (0..n - 1)
        .map(|i| {
            let mut v = Array1::from_elem(n, ZERO);
            v[i] = c(1.0);
            v[i + 1] = c(-1.0);
            v
        })
        .collect();

    // The raw vectors are linearly independent, so this cannot fail.
    let orthonormal = gram_schmidt(&raw).unwrap_or(raw);
    orthonormal
        .into_iter()
        .map(|w| Array2::from_diag(&w.mapv(|z| z * 2f64.sqrt())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{hermiticity_error, trace, trace_product};
    use crate::test_utils::{pauli_x, pauli_y, pauli_z};
    use approx::assert_relative_eq;

    #[test]
    fn test_vectorize_roundtrip_and_kron_identity() {
        let mut a = Array2::zeros((2, 2));
        a[[0, 1]] = Complex64::new(1.0, 2.0);
        a[[1, 0]] = c(3.0);
        let v = vectorize(&a);
        assert_eq!(v[1], Complex64::new(1.0, 2.0));
        assert_eq!(v[2], c(3.0));
        assert_eq!(unvectorize(&v).unwrap(), a);

        // vec(A X B) = (A ⊗ Bᵀ) vec(X)
        let x = pauli_y();
        let b = pauli_z() + pauli_x();
        let lhs = vectorize(&a.dot(&x).dot(&b));
        let rhs = ndarray::linalg::kron(&a, &b.t().to_owned()).dot(&vectorize(&x));
        for (p, q) in lhs.iter().zip(rhs.iter()) {
            assert!((p - q).norm() < 1e-14);
        }
    }

    #[test]
    fn test_unvectorize_rejects_bad_length() {
        let v = Array1::from_elem(3, ZERO);
        assert!(unvectorize(&v).is_err());
    }

    #[test]
    fn test_su2_is_pauli() {
        let g = su_n_generators(2);
        assert_eq!(g.len(), 3);
        assert_eq!(g[0], pauli_x());
        assert_eq!(g[1], pauli_y());
        for (a, b) in g[2].iter().zip(pauli_z().iter()) {
            assert!((a - b).norm() < 1e-14);
        }
    }

    #[test]
    fn test_su_n_orthogonality() {
        for n in 2..=5 {
            let g = su_n_generators(n);
            assert_eq!(g.len(), n * n - 1);
            for (a, ga) in g.iter().enumerate() {
                assert!(hermiticity_error(ga) < 1e-14);
                assert!(trace(ga).norm() < 1e-12);
                for (b, gb) in g.iter().enumerate() {
                    let expected = if a == b { 2.0 } else { 0.0 };
                    assert_relative_eq!(trace_product(ga, gb).re, expected, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_su3_ordering() {
        let g = su_n_generators(3);
        // λ8 ∝ diag(1, 1, −2)/√3 sits at index 7
        let s = 1.0 / 3f64.sqrt();
        assert_relative_eq!(g[7][[0, 0]].re, s, epsilon = 1e-12);
        assert_relative_eq!(g[7][[1, 1]].re, s, epsilon = 1e-12);
        assert_relative_eq!(g[7][[2, 2]].re, -2.0 * s, epsilon = 1e-12);
        // λ4 couples levels 0 and 2
        assert_eq!(g[3][[0, 2]], c(1.0));
    }

    #[test]
    fn test_gram_schmidt_orthonormal() {
        let vs = vec![
            Array1::from(vec![c(1.0), c(1.0), ZERO]),
            Array1::from(vec![c(1.0), Complex64::new(0.0, 1.0), c(1.0)]),
            Array1::from(vec![ZERO, c(2.0), c(1.0)]),
        ];
        let q = gram_schmidt(&vs).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let ip: Complex64 = q[i].iter().zip(q[j].iter()).map(|(a, b)| a.conj() * b).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(ip.re, expected, epsilon = 1e-12);
                assert_relative_eq!(ip.im, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_gram_schmidt_dependent_vectors() {
        let vs = vec![
            Array1::from(vec![c(1.0), c(2.0)]),
            Array1::from(vec![c(2.0), c(4.0)]),
        ];
        assert!(gram_schmidt(&vs).is_err());
    }
}
