// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Holevo Cramér-Rao bound.
//!
//! ```text
//! C_H = min_X  Tr(W Re Z) + ‖√W Im Z √W‖₁,   Z_ij = Tr(ρ X_i X_j)
//!       s.t.   X_i Hermitian,  Tr(∂ρ_j X_i) = δ_ij
//! ```
//!
//! Each `X_i` is expanded in the orthonormal Hermitian basis
//! `{I/√d, λ_a/√2}` with real coefficients `x`, so that
//! `Re Z = x R xᵀ` and `Im Z = x J xᵀ` with `R + iJ = Tr(ρ B_a B_b)`. The
//! affine constraint set is a particular solution plus an orthonormal
//! null-space basis of the constraint matrix.
//!
//! The trace norm is replaced by `Σ_k sqrt(λ_k² + μ²)` over the
//! eigenvalues of `i√W Im Z √W`, which overestimates it by at most `pμ`
//! and is smooth. Each stage minimizes the smoothed objective with L-BFGS
//! and shrinks `μ`. The smoothed sign matrix `S` of a stage also gives a
//! lower bound: for real antisymmetric `S` with `‖iS‖ ≤ 1`,
//!
//! ```text
//! g(S) = min_x  Tr(W x R xᵀ) − Tr(√W S √W x J xᵀ)  ≤  C_H
//! ```
//!
//! is a quadratic minimized in closed form, and its minimizer is a primal
//! candidate as well. The loop stops once the primal value and the best
//! `g(S)` agree, which certifies the minimum.
//!
//! Ref: Holevo (1982), "Probabilistic and Statistical Aspects of Quantum Theory".
//! Ref: Albarelli et al. (2019), Phys. Rev. Lett. 123, 200503.
//! Ref: Nesterov (2005), "Smooth minimization of non-smooth functions".

use std::collections::VecDeque;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use tracing::{debug, trace, warn};

use super::cramer_rao::qfim_with_ld;
use super::types::{Basis, HolevoBound, LdKind};
use crate::error::{NumericalError, Result};
use crate::linalg::{c, complexify, dagger, eigh, identity, inverse_real, sqrt_psd, su_n_generators, trace_product, I};
use crate::validation::{validate_derivatives, validate_weight};

/// Initial smoothing width relative to the starting objective.
const SMOOTHING_START: f64 = 1e-2;
const SMOOTHING_DECAY: f64 = 0.1;
const MAX_STAGES: usize = 12;
/// Relative primal-dual gap that counts as optimal.
const GAP_TOLERANCE: f64 = 1e-8;
const MAX_ITERATIONS: usize = 500;
const LBFGS_MEMORY: usize = 10;
const ARMIJO: f64 = 1e-4;

/// Holevo bound for weight matrix `W`.
///
/// # Errors
/// `SingularMatrix` if the derivatives are linearly dependent (the SLD
/// Fisher matrix is then singular as well).
pub fn holevo_bound(
    rho: &Array2<Complex64>,
    drho: &[Array2<Complex64>],
    weight: &Array2<f64>,
    accuracy: f64,
) -> Result<HolevoBound> {
    let (problem, z0) = HolevoProblem::new(rho, drho, weight, accuracy)?;
    let solution = problem.minimize(z0)?;
    let gap = (solution.upper - solution.lower).max(0.0);

    if solution.converged {
        debug!(
            params = drho.len(),
            value = solution.upper,
            gap = gap,
            iterations = solution.iterations,
            "Holevo bound minimized"
        );
    } else {
        warn!(
            params = drho.len(),
            value = solution.upper,
            gap = gap,
            iterations = solution.iterations,
            "Holevo bound stopped before the duality gap closed"
        );
    }

    Ok(HolevoBound {
        value: solution.upper,
        x: problem.operators(&solution.z),
        gap,
        iterations: solution.iterations,
    })
}

/// Orthonormal Hermitian basis `{I/√d, λ_a/√2}` with `Tr(B_a B_b) = δ_ab`.
fn hermitian_basis(dim: usize) -> Vec<Array2<Complex64>> {
    let mut basis = Vec::with_capacity(dim * dim);
    basis.push(identity(dim) * c(1.0 / (dim as f64).sqrt()));
    basis.extend(
        su_n_generators(dim)
            .into_iter()
            .map(|g| g * c(1.0 / 2f64.sqrt())),
    );
    basis
}

/// Orthonormal basis (as columns) of the null space of `a`.
fn null_space(a: &Array2<f64>) -> std::result::Result<Array2<f64>, NumericalError> {
    let (rows, n) = a.dim();
    let mut kept: Vec<Array1<f64>> = Vec::with_capacity(n);

    let orthogonalize = |v: &mut Array1<f64>, kept: &[Array1<f64>]| {
        // Two passes keep the residual orthogonal to working precision
        for _ in 0..2 {
            for e in kept {
                let r = e.dot(v);
                v.scaled_add(-r, e);
            }
        }
    };

    for j in 0..rows {
        let mut v = a.row(j).to_owned();
        let scale = v.dot(&v).sqrt();
        orthogonalize(&mut v, &kept);
        let nrm = v.dot(&v).sqrt();
        if nrm <= 1e-10 * scale.max(1e-300) {
            return Err(NumericalError::SingularMatrix(format!(
                "derivative {} is linearly dependent on the others",
                j
            )));
        }
        kept.push(v / nrm);
    }

    let mut null = Vec::with_capacity(n - rows.min(n));
    for k in 0..n {
        if kept.len() == n {
            break;
        }
        let mut v = Array1::<f64>::zeros(n);
        v[k] = 1.0;
        orthogonalize(&mut v, &kept);
        let nrm = v.dot(&v).sqrt();
        if nrm > 1e-8 {
            let e = v / nrm;
            kept.push(e.clone());
            null.push(e);
        }
    }

    let mut out = Array2::<f64>::zeros((n, null.len()));
    for (col, v) in null.iter().enumerate() {
        out.column_mut(col).assign(v);
    }
    Ok(out)
}

/// Kronecker product of two real matrices.
fn kron(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let (br, bc) = b.dim();
    Array2::from_shape_fn((a.nrows() * br, a.ncols() * bc), |(i, j)| {
        a[[i / br, j / bc]] * b[[i % br, j % bc]]
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Objective at one point of the null-space coordinates.
struct Evaluation {
    /// Exact `Tr(W Re Z) + ‖√W Im Z √W‖₁`.
    value: f64,
    /// Value with the smoothed trace norm.
    smoothed: f64,
    /// Gradient of `smoothed`.
    grad: Vec<f64>,
    /// Real antisymmetric `S` with `i·S` the smoothed sign of `i√W Im Z √W`.
    sign: Array2<f64>,
}

/// Minimizer and certificate.
struct Solution {
    z: Vec<f64>,
    upper: f64,
    lower: f64,
    iterations: usize,
    converged: bool,
}

struct HolevoProblem<'a> {
    dim: usize,
    basis: Vec<Array2<Complex64>>,
    /// Re Tr(ρ B_a B_b)
    re_g: Array2<f64>,
    /// Im Tr(ρ B_a B_b)
    im_g: Array2<f64>,
    x_part: Array2<f64>,
    null: Array2<f64>,
    weight: &'a Array2<f64>,
    sqrt_w: Array2<f64>,
}

impl<'a> HolevoProblem<'a> {
    /// Set up the parametrized problem and return it with the SLD starting point.
    fn new(
        rho: &Array2<Complex64>,
        drho: &[Array2<Complex64>],
        weight: &'a Array2<f64>,
        accuracy: f64,
    ) -> Result<(Self, Vec<f64>)> {
        let dim = validate_derivatives(rho, drho)?;
        let p = drho.len();
        validate_weight(weight, p)?;

        let basis = hermitian_basis(dim);
        let n = basis.len();

        // Constraint rows: C[j, a] = Tr(∂ρ_j B_a)
        let constraints = Array2::from_shape_fn((p, n), |(j, a)| trace_product(&drho[j], &basis[a]).re);

        let rho_b: Vec<Array2<Complex64>> = basis.iter().map(|b| rho.dot(b)).collect();
        let gram_rho = Array2::from_shape_fn((n, n), |(a, b)| trace_product(&rho_b[a], &basis[b]));

        let (info, lds) = qfim_with_ld(rho, drho, LdKind::Sld, Basis::Original, accuracy)?;
        let f_inv = inverse_real(&info.to_matrix())?;
        let ld_coeffs = Array2::from_shape_fn((p, n), |(j, a)| trace_product(&basis[a], &lds[j]).re);
        let x_sld = f_inv.dot(&ld_coeffs);

        // Minimum-norm particular solution, one row per X_i
        let gram = constraints.dot(&constraints.t());
        let x_part = inverse_real(&gram)?.dot(&constraints);
        let null = null_space(&constraints)?;

        let z0: Vec<f64> = (&x_sld - &x_part).dot(&null).iter().copied().collect();
        let problem = Self {
            dim,
            basis,
            re_g: gram_rho.mapv(|v| v.re),
            im_g: gram_rho.mapv(|v| v.im),
            x_part,
            null,
            weight,
            sqrt_w: sqrt_psd(weight)?,
        };
        Ok((problem, z0))
    }

    fn coefficients(&self, z: &[f64]) -> Array2<f64> {
        let p = self.x_part.nrows();
        let k = self.null.ncols();
        if k == 0 {
            return self.x_part.clone();
        }
        let zm = Array2::from_shape_fn((p, k), |(i, j)| z[i * k + j]);
        &self.x_part + &zm.dot(&self.null.t())
    }

    fn operators(&self, z: &[f64]) -> Vec<Array2<Complex64>> {
        let x = self.coefficients(z);
        x.rows()
            .into_iter()
            .map(|row| {
                let mut op = Array2::<Complex64>::zeros((self.dim, self.dim));
                for (coef, b) in row.iter().zip(self.basis.iter()) {
                    op.scaled_add(c(*coef), b);
                }
                op
            })
            .collect()
    }

    /// Exact and smoothed objective with the smoothed gradient.
    fn evaluate(&self, z: &[f64], mu: f64) -> std::result::Result<Evaluation, NumericalError> {
        let x = self.coefficients(z);
        let p = x.nrows();
        let xr = x.dot(&self.re_g);
        let xj = x.dot(&self.im_g);
        let re_z = xr.dot(&x.t());
        let im_z = xj.dot(&x.t());

        let re_part: f64 = (self.weight * &re_z).sum();
        let a = self.sqrt_w.dot(&im_z).dot(&self.sqrt_w);
        // i·A is Hermitian for real antisymmetric A
        let eig = eigh(&a.mapv(|v| I * v))?;

        let mut trace_norm = 0.0;
        let mut smooth = 0.0;
        let mut ratios = Vec::with_capacity(p);
        for &lambda in eig.values.iter() {
            let r = lambda.hypot(mu);
            trace_norm += lambda.abs();
            smooth += r;
            ratios.push(if r > 0.0 { lambda / r } else { 0.0 });
        }

        // U = V diag(λ/√(λ²+μ²)) V† is purely imaginary: U = iS
        let v = &eig.vectors;
        let scaled = Array2::from_shape_fn((p, p), |(r, k)| v[[r, k]] * ratios[k]);
        let sign = scaled.dot(&dagger(v)).mapv(|u| u.im);

        let t = self.sqrt_w.dot(&sign).dot(&self.sqrt_w);
        let grad_x = (self.weight.dot(&xr) - t.dot(&xj)) * 2.0;
        let grad: Vec<f64> = grad_x.dot(&self.null).iter().copied().collect();

        let value = re_part + trace_norm;
        let smoothed = re_part + smooth;
        if !value.is_finite() || !smoothed.is_finite() || grad.iter().any(|g| !g.is_finite()) {
            return Err(NumericalError::NonFinite("Holevo objective".into()));
        }
        Ok(Evaluation {
            value,
            smoothed,
            grad,
            sign,
        })
    }

    /// Lower bound `g(S)` and the coordinates that attain it.
    fn dual_bound(&self, sign: &Array2<f64>) -> std::result::Result<(f64, Vec<f64>), NumericalError> {
        let p = self.x_part.nrows();
        let k = self.null.ncols();
        let t = self.sqrt_w.dot(sign).dot(&self.sqrt_w);
        // q(x) = vec(x)ᵀ Q vec(x) with row-major vec
        let q = kron(self.weight, &self.re_g) + kron(&t, &self.im_g);
        let v0: Array1<f64> = self.x_part.iter().copied().collect();
        let qv0 = q.dot(&v0);
        let c0 = v0.dot(&qv0);
        if k == 0 {
            return Ok((c0, Vec::new()));
        }

        let proj = kron(&Array2::<f64>::eye(p), &self.null);
        let h = proj.t().dot(&q).dot(&proj);
        let b = proj.t().dot(&qv0).mapv(c);
        let eig = eigh(&complexify(&h))?;
        let cutoff = 1e-10 * eig.values.iter().fold(0.0f64, |m, v| m.max(v.abs()));

        let mut lower = c0;
        let mut z = Array1::<f64>::zeros(p * k);
        for (m, &lambda) in eig.values.iter().enumerate() {
            if lambda <= cutoff {
                continue;
            }
            let u = eig.vector(m);
            let overlap: Complex64 = u.iter().zip(b.iter()).map(|(ui, bi)| ui.conj() * bi).sum();
            lower -= overlap.norm_sqr() / lambda;
            z.scaled_add(-1.0 / lambda, &u.mapv(|ui| (ui * overlap).re));
        }

        if !lower.is_finite() {
            return Err(NumericalError::NonFinite("Holevo lower bound".into()));
        }
        Ok((lower, z.to_vec()))
    }

    /// L-BFGS on the smoothed objective at fixed `mu`.
    fn descend(
        &self,
        mut z: Vec<f64>,
        mu: f64,
        tolerance: f64,
    ) -> std::result::Result<(Vec<f64>, Evaluation, usize), NumericalError> {
        let mut memory = Lbfgs::new(LBFGS_MEMORY);
        let mut current = self.evaluate(&z, mu)?;
        let mut iterations = 0;

        while iterations < MAX_ITERATIONS && !z.is_empty() {
            let g2 = dot(&current.grad, &current.grad);
            if g2.sqrt() <= tolerance {
                break;
            }
            iterations += 1;

            let mut direction = memory.direction(&current.grad);
            let mut slope = dot(&current.grad, &direction);
            if slope >= 0.0 {
                memory.clear();
                direction = current.grad.iter().map(|g| -g).collect();
                slope = -g2;
            }

            let mut step = 1.0;
            let mut accepted = None;
            while step > 1e-20 {
                let trial: Vec<f64> = z.iter().zip(&direction).map(|(zi, di)| zi + step * di).collect();
                let next = self.evaluate(&trial, mu)?;
                if next.smoothed <= current.smoothed + ARMIJO * step * slope {
                    accepted = Some((trial, next));
                    break;
                }
                step *= 0.5;
            }
            let Some((trial, next)) = accepted else {
                break;
            };

            let s: Vec<f64> = trial.iter().zip(&z).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = next.grad.iter().zip(&current.grad).map(|(a, b)| a - b).collect();
            memory.push(s, y);

            let decrease = current.smoothed - next.smoothed;
            z = trial;
            current = next;
            if decrease <= 1e-15 * current.smoothed.abs() {
                break;
            }
        }
        Ok((z, current, iterations))
    }

    /// Continuation in the smoothing width until the primal-dual gap closes.
    fn minimize(&self, z0: Vec<f64>) -> std::result::Result<Solution, NumericalError> {
        let start = self.evaluate(&z0, 0.0)?;
        let scale = start.value.abs().max(f64::MIN_POSITIVE);

        let mut best = z0.clone();
        let mut upper = start.value;
        let mut lower = f64::NEG_INFINITY;
        let mut z = z0;
        let mut mu = SMOOTHING_START * scale;
        let mut iterations = 0;
        let mut converged = false;

        for stage in 0..MAX_STAGES {
            let (next, eval, its) = self.descend(z, mu, 1e-3 * mu)?;
            iterations += its;
            z = next;
            if eval.value < upper {
                upper = eval.value;
                best = z.clone();
            }

            let (bound, z_dual) = self.dual_bound(&eval.sign)?;
            lower = lower.max(bound);
            let dual_value = self.evaluate(&z_dual, 0.0)?.value;
            if dual_value < upper {
                upper = dual_value;
                best = z_dual.clone();
            }
            if dual_value < eval.value {
                z = z_dual;
            }

            trace!(stage, mu, upper, lower, iterations, "Holevo smoothing stage");
            if upper - lower <= GAP_TOLERANCE * scale {
                converged = true;
                break;
            }
            mu *= SMOOTHING_DECAY;
        }

        Ok(Solution {
            z: best,
            upper,
            lower,
            iterations,
            converged,
        })
    }
}

/// Limited-memory inverse-Hessian approximation (two-loop recursion).
struct Lbfgs {
    s: VecDeque<Vec<f64>>,
    y: VecDeque<Vec<f64>>,
    rho: VecDeque<f64>,
    m: usize,
}

impl Lbfgs {
    fn new(m: usize) -> Self {
        Self {
            s: VecDeque::with_capacity(m),
            y: VecDeque::with_capacity(m),
            rho: VecDeque::with_capacity(m),
            m,
        }
    }

    fn clear(&mut self) {
        self.s.clear();
        self.y.clear();
        self.rho.clear();
    }

    /// Store a step pair; pairs without positive curvature are skipped.
    fn push(&mut self, s: Vec<f64>, y: Vec<f64>) {
        let sy = dot(&s, &y);
        if sy <= 1e-12 * dot(&s, &s).sqrt() * dot(&y, &y).sqrt() {
            return;
        }
        if self.s.len() == self.m {
            self.s.pop_front();
            self.y.pop_front();
            self.rho.pop_front();
        }
        self.s.push_back(s);
        self.y.push_back(y);
        self.rho.push_back(1.0 / sy);
    }

    /// Search direction `−H·g`.
    fn direction(&self, grad: &[f64]) -> Vec<f64> {
        let k = self.s.len();
        let mut q = grad.to_vec();
        let mut alpha = vec![0.0; k];

        for i in (0..k).rev() {
            alpha[i] = self.rho[i] * dot(&self.s[i], &q);
            for (qj, yj) in q.iter_mut().zip(&self.y[i]) {
                *qj -= alpha[i] * yj;
            }
        }

        let gamma = match (self.s.back(), self.y.back()) {
            (Some(s), Some(y)) => {
                let yy = dot(y, y);
                if yy > 0.0 {
                    dot(s, y) / yy
                } else {
                    1.0
                }
            }
            _ => 1.0,
        };
        for qj in q.iter_mut() {
            *qj *= gamma;
        }

        for i in 0..k {
            let beta = self.rho[i] * dot(&self.y[i], &q);
            for (qj, sj) in q.iter_mut().zip(&self.s[i]) {
                *qj += (alpha[i] - beta) * sj;
            }
        }

        q.iter().map(|v| -v).collect()
    }
}
