// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Classical and quantum Fisher information.
//!
//! Logarithmic derivatives are built in the eigenbasis of ρ,
//! `ρ = Σ λ_i |v_i⟩⟨v_i|`, from the matrix elements `⟨v_i|∂ρ|v_j⟩`:
//!
//! ```text
//! SLD[i,j] = 2⟨v_i|∂ρ|v_j⟩ / (λ_i + λ_j)
//! RLD[i,j] =  ⟨v_i|∂ρ|v_j⟩ / λ_i
//! LLD[j,i] = (⟨v_i|∂ρ|v_j⟩ / λ_j)*
//! ```
//!
//! Every denominator (and every outcome probability in the CFIM) whose
//! magnitude does not exceed `accuracy` contributes zero.
//!
//! Ref: Helstrom (1976), "Quantum Detection and Estimation Theory".
//! Ref: Liu et al. (2020), J. Phys. A 53, 023001.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::trace;

use super::types::{Basis, Information, LdKind};
use crate::error::Result;
use crate::linalg::{dagger, eigh, trace_product, HermitianEigen};
use crate::validation::{validate_derivatives, validate_povm_shapes};

/// Purity `Re Tr(ρ²)`.
pub fn purity(rho: &Array2<Complex64>) -> f64 {
    trace_product(rho, rho).re
}

/// Classical Fisher information matrix of the outcome distribution
/// `p_m = Tr(ρ M_m)`.
///
/// `CFIM[a,b] = Σ_m ∂_a p_m ∂_b p_m / p_m` over outcomes with
/// `p_m > accuracy`.
pub fn cfim(
    rho: &Array2<Complex64>,
    drho: &[Array2<Complex64>],
    povm: &[Array2<Complex64>],
    accuracy: f64,
) -> Result<Information> {
    let dim = validate_derivatives(rho, drho)?;
    validate_povm_shapes(dim, povm)?;

    let p_num = drho.len();
    let mut f = Array2::<f64>::zeros((p_num, p_num));
    for (m_idx, m) in povm.iter().enumerate() {
        let p = trace_product(rho, m).re;
        if p <= accuracy {
            trace!(outcome = m_idx, probability = p, "skipping outcome below accuracy");
            continue;
        }
        let dp: Vec<f64> = drho.iter().map(|d| trace_product(d, m).re).collect();
        for a in 0..p_num {
            for b in a..p_num {
                let v = dp[a] * dp[b] / p;
                f[[a, b]] += v;
                if a != b {
                    f[[b, a]] += v;
                }
            }
        }
    }
    Ok(Information::from_matrix(f))
}

/// Symmetric logarithmic derivatives, one per parameter.
///
/// Pure states (`|1 − Tr ρ²| < accuracy`) take the closed form `L = 2∂ρ`
/// without diagonalizing ρ unless the eigenbasis is requested.
pub fn sld(
    rho: &Array2<Complex64>,
    drho: &[Array2<Complex64>],
    basis: Basis,
    accuracy: f64,
) -> Result<Vec<Array2<Complex64>>> {
    validate_derivatives(rho, drho)?;

    if (1.0 - purity(rho)).abs() < accuracy {
        let lds: Vec<Array2<Complex64>> = drho.iter().map(|d| d * Complex64::new(2.0, 0.0)).collect();
        return match basis {
            Basis::Original => Ok(lds),
            Basis::Eigen => {
                let eig = eigh(rho)?;
                Ok(lds.iter().map(|l| eig.to_eigenbasis(l)).collect())
            }
        };
    }

    let eig = eigh(rho)?;
    Ok(sld_from_eigen(&eig, drho, basis, accuracy))
}

fn sld_from_eigen(
    eig: &HermitianEigen,
    drho: &[Array2<Complex64>],
    basis: Basis,
    accuracy: f64,
) -> Vec<Array2<Complex64>> {
    let dim = eig.values.len();
    let lambda = &eig.values;
    drho.iter()
        .map(|d| {
            let de = eig.to_eigenbasis(d);
            let l_eig = Array2::from_shape_fn((dim, dim), |(i, j)| {
                let denom = lambda[i] + lambda[j];
                if denom.abs() > accuracy {
                    de[[i, j]] * (2.0 / denom)
                } else {
                    Complex64::new(0.0, 0.0)
                }
            });
            rotate(eig, l_eig, basis)
        })
        .collect()
}

/// Right logarithmic derivatives: `∂ρ = ρ·L` on the support of ρ.
///
/// Eigenvalues at or below `accuracy`, including small negative ones left
/// by round-off, are treated as outside the support.
pub fn rld(
    rho: &Array2<Complex64>,
    drho: &[Array2<Complex64>],
    basis: Basis,
    accuracy: f64,
) -> Result<Vec<Array2<Complex64>>> {
    validate_derivatives(rho, drho)?;
    let eig = eigh(rho)?;
    let dim = eig.values.len();
    let lambda = &eig.values;

    Ok(drho
        .iter()
        .map(|d| {
            let de = eig.to_eigenbasis(d);
            let l_eig = Array2::from_shape_fn((dim, dim), |(i, j)| {
                if lambda[i] > accuracy {
                    de[[i, j]] / lambda[i]
                } else {
                    Complex64::new(0.0, 0.0)
                }
            });
            rotate(&eig, l_eig, basis)
        })
        .collect())
}

/// Left logarithmic derivatives: `∂ρ = L†·ρ` on the support of ρ.
pub fn lld(
    rho: &Array2<Complex64>,
    drho: &[Array2<Complex64>],
    basis: Basis,
    accuracy: f64,
) -> Result<Vec<Array2<Complex64>>> {
    validate_derivatives(rho, drho)?;
    let eig = eigh(rho)?;
    let dim = eig.values.len();
    let lambda = &eig.values;

    Ok(drho
        .iter()
        .map(|d| {
            let de = eig.to_eigenbasis(d);
            let mut l_eig = Array2::<Complex64>::zeros((dim, dim));
            for i in 0..dim {
                for j in 0..dim {
                    if lambda[j] > accuracy {
                        l_eig[[j, i]] = (de[[i, j]] / lambda[j]).conj();
                    }
                }
            }
            rotate(&eig, l_eig, basis)
        })
        .collect())
}

fn rotate(eig: &HermitianEigen, l_eig: Array2<Complex64>, basis: Basis) -> Array2<Complex64> {
    match basis {
        Basis::Original => eig.from_eigenbasis(&l_eig),
        Basis::Eigen => l_eig,
    }
}

/// Logarithmic derivatives of the requested family.
pub fn logarithmic_derivatives(
    rho: &Array2<Complex64>,
    drho: &[Array2<Complex64>],
    kind: LdKind,
    basis: Basis,
    accuracy: f64,
) -> Result<Vec<Array2<Complex64>>> {
    match kind {
        LdKind::Sld => sld(rho, drho, basis, accuracy),
        LdKind::Rld => rld(rho, drho, basis, accuracy),
        LdKind::Lld => lld(rho, drho, basis, accuracy),
    }
}

/// Quantum Fisher information matrix.
///
/// The value does not depend on `basis`; it only selects how the
/// derivatives returned by [`qfim_with_ld`] are represented.
pub fn qfim(
    rho: &Array2<Complex64>,
    drho: &[Array2<Complex64>],
    kind: LdKind,
    basis: Basis,
    accuracy: f64,
) -> Result<Information> {
    qfim_with_ld(rho, drho, kind, basis, accuracy).map(|(info, _)| info)
}

/// Quantum Fisher information matrix together with the logarithmic
/// derivatives it was built from, in the requested basis.
pub fn qfim_with_ld(
    rho: &Array2<Complex64>,
    drho: &[Array2<Complex64>],
    kind: LdKind,
    basis: Basis,
    accuracy: f64,
) -> Result<(Information, Vec<Array2<Complex64>>)> {
    let lds = logarithmic_derivatives(rho, drho, kind, Basis::Original, accuracy)?;
    let info = Information::from_matrix(assemble_qfim(rho, &lds, kind));
    let exported = match basis {
        Basis::Original => lds,
        Basis::Eigen => {
            let eig = eigh(rho)?;
            lds.iter().map(|l| eig.to_eigenbasis(l)).collect()
        }
    };
    Ok((info, exported))
}

/// `F[a,b] = Re Tr(ρ (L_a L_b + L_b L_a))/2` for SLD,
/// `Re Tr(ρ L_a L_b†)` for RLD/LLD; mirrored across the diagonal.
fn assemble_qfim(rho: &Array2<Complex64>, lds: &[Array2<Complex64>], kind: LdKind) -> Array2<f64> {
    let p = lds.len();
    let mut f = Array2::<f64>::zeros((p, p));
    for a in 0..p {
        for b in a..p {
            let v = match kind {
                LdKind::Sld => {
                    let ac = lds[a].dot(&lds[b]) + lds[b].dot(&lds[a]);
                    0.5 * trace_product(rho, &ac).re
                }
                LdKind::Rld | LdKind::Lld => {
                    trace_product(rho, &lds[a].dot(&dagger(&lds[b]))).re
                }
            };
            f[[a, b]] = v;
            f[[b, a]] = v;
        }
    }
    f
}
