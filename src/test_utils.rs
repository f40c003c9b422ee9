// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities: Pauli matrices and random states/measurements.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::linalg::{c, dagger, eigh, ket_bra, norm, trace, ZERO};

pub fn pauli_x() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 1]] = c(1.0);
    m[[1, 0]] = c(1.0);
    m
}

pub fn pauli_y() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 1]] = Complex64::new(0.0, -1.0);
    m[[1, 0]] = Complex64::new(0.0, 1.0);
    m
}

pub fn pauli_z() -> Array2<Complex64> {
    let mut m = Array2::zeros((2, 2));
    m[[0, 0]] = c(1.0);
    m[[1, 1]] = c(-1.0);
    m
}

fn gaussian(rng: &mut StdRng) -> Complex64 {
    Complex64::new(rng.sample(StandardNormal), rng.sample(StandardNormal))
}

/// Haar-random pure state vector.
pub fn random_pure_state(d: usize, rng: &mut StdRng) -> Array1<Complex64> {
    let v: Array1<Complex64> = (0..d).map(|_| gaussian(rng)).collect();
    let n = norm(&v);
    v.mapv(|z| z / n)
}

/// Full-rank random density matrix ρ = GG†/Tr(GG†) (Ginibre ensemble).
pub fn random_density_matrix(d: usize, rng: &mut StdRng) -> Array2<Complex64> {
    let g = Array2::from_shape_fn((d, d), |_| gaussian(rng));
    let rho = g.dot(&dagger(&g));
    let tr = trace(&rho);
    rho.mapv(|z| z / tr)
}

/// Random Hermitian matrix with Gaussian entries.
pub fn random_hermitian(d: usize, rng: &mut StdRng) -> Array2<Complex64> {
    let g = Array2::from_shape_fn((d, d), |_| gaussian(rng));
    (&g + &dagger(&g)) * c(0.5)
}

/// Random traceless Hermitian derivatives, one per parameter.
pub fn random_derivatives(d: usize, p: usize, rng: &mut StdRng) -> Vec<Array2<Complex64>> {
    (0..p)
        .map(|_| {
            let mut h = random_hermitian(d, rng);
            let shift = trace(&h) / c(d as f64);
            for i in 0..d {
                h[[i, i]] -= shift;
            }
            h
        })
        .collect()
}

/// Random POVM with `n` elements: M_i = S^{-1/2} A_i S^{-1/2}, S = Σ A_i.
pub fn random_povm(d: usize, n: usize, rng: &mut StdRng) -> Vec<Array2<Complex64>> {
    let raw: Vec<Array2<Complex64>> = (0..n)
        .map(|_| {
            let v = random_pure_state(d, rng);
            ket_bra(&v, &v) + random_density_matrix(d, rng) * c(0.1)
        })
        .collect();

    let mut s = Array2::<Complex64>::zeros((d, d));
    for a in &raw {
        s = s + a;
    }
    let eig = eigh(&s).unwrap();
    let mut s_inv_half = Array2::from_elem((d, d), ZERO);
    for k in 0..d {
        let v = eig.vector(k);
        s_inv_half = s_inv_half + ket_bra(&v, &v) * c(1.0 / eig.values[k].sqrt());
    }
    raw.iter()
        .map(|a| s_inv_half.dot(a).dot(&s_inv_half))
        .collect()
}
