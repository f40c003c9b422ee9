// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lindblad master equation with exact parameter derivatives.
//!
//!   dρ/dt = -i[H(t), ρ] + Σ_k γ_k (L_k ρ L_k† − ½{L_k†L_k, ρ})
//!
//! with a piecewise-constant Hamiltonian
//!
//!   H_k = H0 + Σ_j u_j(k) Hc_j
//!
//! whose dependence on the estimated parameters enters through `∂H0`.
//!
//! Each time step is propagated by a matrix exponential. The parameter
//! derivative of the propagator is read off the off-diagonal block of the
//! exponential of a block-triangular generator, so `∂ρ` is carried exactly
//! rather than by finite differences:
//!
//! - Noiseless branch (all rates zero): `exp([[−iH, −i∂H], [0, −iH]] dt)`
//!   yields `U` and `∂U`.
//! - Noise branch: with the Liouvillian `𝓛` acting on row-major `vec(ρ)`,
//!   `exp([[𝓛, 0], [∂𝓛, 𝓛]] dt)` maps `(vec ρ, vec ∂ρ)` forward.
//!
//! Ref: Breuer & Petruccione, "The Theory of Open Quantum Systems" (2002), Ch. 3.
//! Ref: Van Loan (1978), IEEE Trans. Autom. Control 23, 395.

use ndarray::{linalg::kron, s, Array2};
use num_complex::Complex64;
use tracing::debug;

use super::types::{Decay, DynamicsState, Trajectory};
use super::Dynamics;
use crate::error::{NumericalError, Result, ValidationError};
use crate::linalg::{c, dagger, identity, matrix_exp, unvectorize, vectorize, I};
use crate::validation::validate_control_pulses;

/// Lindblad dynamics on a fixed time grid.
#[derive(Debug, Clone)]
pub struct Lindblad {
    tspan: Vec<f64>,
    h0: Array2<Complex64>,
    dh: Vec<Array2<Complex64>>,
    decay: Vec<Decay>,
    control_hamiltonians: Vec<Array2<Complex64>>,
}

/// One-step propagator and its parameter derivatives.
#[derive(Debug, Clone)]
enum Propagator {
    Unitary {
        u: Array2<Complex64>,
        du: Vec<Array2<Complex64>>,
    },
    Superoperator {
        e: Array2<Complex64>,
        de: Vec<Array2<Complex64>>,
    },
}

impl Propagator {
    fn apply(&self, state: &DynamicsState) -> std::result::Result<DynamicsState, NumericalError> {
        match self {
            Propagator::Unitary { u, du } => {
                let u_dag = dagger(u);
                let rho_u_dag = state.rho.dot(&u_dag);
                let rho = u.dot(&rho_u_dag);
                let u_rho = u.dot(&state.rho);
                let drho = du
                    .iter()
                    .zip(state.drho.iter())
                    .map(|(dua, drho_a)| {
                        dua.dot(&rho_u_dag) + u.dot(drho_a).dot(&u_dag) + u_rho.dot(&dagger(dua))
                    })
                    .collect();
                Ok(DynamicsState { rho, drho })
            }
            Propagator::Superoperator { e, de } => {
                let v_rho = vectorize(&state.rho);
                let rho = unvectorize(&e.dot(&v_rho))?;
                let drho = de
                    .iter()
                    .zip(state.drho.iter())
                    .map(|(dea, drho_a)| unvectorize(&(dea.dot(&v_rho) + e.dot(&vectorize(drho_a)))))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(DynamicsState { rho, drho })
            }
        }
    }
}

impl Lindblad {
    /// Create Lindblad dynamics.
    ///
    /// # Arguments
    /// * `tspan` — Strictly increasing time grid (at least two points).
    /// * `h0` — Free Hamiltonian (d × d).
    /// * `dh` — `∂H0/∂x_a`, one per estimated parameter.
    /// * `decay` — Collapse channels; an empty list or all-zero rates selects
    ///   the noiseless branch.
    pub fn new(
        tspan: Vec<f64>,
        h0: Array2<Complex64>,
        dh: Vec<Array2<Complex64>>,
        decay: Vec<Decay>,
    ) -> Result<Self> {
        if tspan.len() < 2 {
            return Err(ValidationError::Field {
                field: "tspan".into(),
                message: format!("needs at least two time points, got {}", tspan.len()),
            }
            .into());
        }
        if tspan.iter().any(|t| !t.is_finite()) || tspan.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ValidationError::Field {
                field: "tspan".into(),
                message: "must be finite and strictly increasing".into(),
            }
            .into());
        }

        let d = h0.nrows();
        check_operator("H0", &h0, d)?;
        if dh.is_empty() {
            return Err(ValidationError::Field {
                field: "dH".into(),
                message: "at least one parameter derivative is required".into(),
            }
            .into());
        }
        for (a, op) in dh.iter().enumerate() {
            check_operator(&format!("dH[{}]", a), op, d)?;
        }
        for (k, ch) in decay.iter().enumerate() {
            check_operator(&format!("decay[{}]", k), &ch.operator, d)?;
            if !(ch.rate >= 0.0 && ch.rate.is_finite()) {
                return Err(ValidationError::Field {
                    field: format!("decay[{}]", k),
                    message: format!("rate must be finite and ≥ 0, got {}", ch.rate),
                }
                .into());
            }
        }

        Ok(Self {
            tspan,
            h0,
            dh,
            decay,
            control_hamiltonians: Vec::new(),
        })
    }

    /// Attach control Hamiltonians `Hc_j`.
    pub fn with_controls(mut self, control_hamiltonians: Vec<Array2<Complex64>>) -> Result<Self> {
        let d = self.dim();
        for (j, hc) in control_hamiltonians.iter().enumerate() {
            check_operator(&format!("Hc[{}]", j), hc, d)?;
        }
        self.control_hamiltonians = control_hamiltonians;
        Ok(self)
    }

    pub fn tspan(&self) -> &[f64] {
        &self.tspan
    }

    /// Whether every collapse rate vanishes.
    pub fn is_noiseless(&self) -> bool {
        self.decay.iter().all(|ch| ch.rate == 0.0)
    }

    /// `H = H0 + Σ_j u_j Hc_j`.
    pub fn hamiltonian(&self, controls: &[f64]) -> Array2<Complex64> {
        let mut h = self.h0.clone();
        for (u, hc) in controls.iter().zip(self.control_hamiltonians.iter()) {
            if *u != 0.0 {
                h.scaled_add(c(*u), hc);
            }
        }
        h
    }

    /// Liouvillian superoperator of `H` and the collapse channels.
    pub fn liouvillian(&self, h: &Array2<Complex64>) -> Array2<Complex64> {
        let mut l = hamiltonian_superoperator(h);
        for ch in self.decay.iter().filter(|ch| ch.rate != 0.0) {
            l = l + dissipator_superoperator(ch);
        }
        l
    }

    /// Evolve `ρ0` over the full grid and record every time point.
    pub fn evolve(&self, rho0: &Array2<Complex64>, pulses: Option<&Array2<f64>>) -> Result<Trajectory> {
        let mut trajectory = Trajectory::default();
        self.propagate(rho0, pulses, |t, state| trajectory.push(t, state))?;
        debug!(
            steps = self.steps(),
            noiseless = self.is_noiseless(),
            "Lindblad trajectory computed"
        );
        Ok(trajectory)
    }

    fn propagate<F>(
        &self,
        rho0: &Array2<Complex64>,
        pulses: Option<&Array2<f64>>,
        mut record: F,
    ) -> Result<DynamicsState>
    where
        F: FnMut(f64, &DynamicsState),
    {
        if rho0.dim() != (self.dim(), self.dim()) {
            return Err(ValidationError::DimensionMismatch {
                what: "rho0".into(),
                expected: format!("{} × {}", self.dim(), self.dim()),
                actual: format!("{} × {}", rho0.nrows(), rho0.ncols()),
            }
            .into());
        }
        if let Some(p) = pulses {
            validate_control_pulses(p, self.ctrl_num(), self.steps(), (f64::NEG_INFINITY, f64::INFINITY))?;
        }

        let mut state = self.initial(rho0);
        record(self.tspan[0], &state);

        // Consecutive steps with the same dt and controls share a propagator
        let mut current: Option<(f64, Vec<f64>, Propagator)> = None;
        for k in 0..self.steps() {
            let dt = self.tspan[k + 1] - self.tspan[k];
            let controls = controls_at(pulses, k, self.ctrl_num());
            let stale = match &current {
                Some((cdt, cc, _)) => (cdt - dt).abs() > 1e-12 * dt.max(1.0) || *cc != controls,
                None => true,
            };
            if stale {
                let prop = self.propagator(dt, &controls)?;
                current = Some((dt, controls, prop));
            }
            if let Some((_, _, prop)) = &current {
                state = prop.apply(&state)?;
            }
            record(self.tspan[k + 1], &state);
        }
        Ok(state)
    }

    fn propagator(&self, dt: f64, controls: &[f64]) -> std::result::Result<Propagator, NumericalError> {
        let h = self.hamiltonian(controls);
        if self.is_noiseless() {
            self.unitary_propagator(&h, dt)
        } else {
            self.superoperator_propagator(&h, dt)
        }
    }

    fn unitary_propagator(
        &self,
        h: &Array2<Complex64>,
        dt: f64,
    ) -> std::result::Result<Propagator, NumericalError> {
        let d = self.dim();
        let gen = h * (-I * dt);
        let mut u = None;
        let mut du = Vec::with_capacity(self.dh.len());
        for dha in &self.dh {
            let block = upper_block(&gen, &(dha * (-I * dt)));
            let e = matrix_exp(&block)?;
            if u.is_none() {
                u = Some(e.slice(s![..d, ..d]).to_owned());
            }
            du.push(e.slice(s![..d, d..]).to_owned());
        }
        let u = match u {
            Some(u) => u,
            None => matrix_exp(&gen)?,
        };
        Ok(Propagator::Unitary { u, du })
    }

    fn superoperator_propagator(
        &self,
        h: &Array2<Complex64>,
        dt: f64,
    ) -> std::result::Result<Propagator, NumericalError> {
        let n = self.dim() * self.dim();
        let gen = self.liouvillian(h) * c(dt);
        let mut e = None;
        let mut de = Vec::with_capacity(self.dh.len());
        for dha in &self.dh {
            // H enters 𝓛 linearly and the dissipator does not depend on x_a
            let dl = hamiltonian_superoperator(dha) * c(dt);
            let ex = matrix_exp(&lower_block(&gen, &dl))?;
            if e.is_none() {
                e = Some(ex.slice(s![..n, ..n]).to_owned());
            }
            de.push(ex.slice(s![n.., ..n]).to_owned());
        }
        let e = match e {
            Some(e) => e,
            None => matrix_exp(&gen)?,
        };
        Ok(Propagator::Superoperator { e, de })
    }
}

impl Dynamics for Lindblad {
    fn dim(&self) -> usize {
        self.h0.nrows()
    }

    fn param_num(&self) -> usize {
        self.dh.len()
    }

    fn steps(&self) -> usize {
        self.tspan.len() - 1
    }

    fn ctrl_num(&self) -> usize {
        self.control_hamiltonians.len()
    }

    fn step(&self, state: &DynamicsState, k: usize, controls: &[f64]) -> Result<DynamicsState> {
        if k >= self.steps() {
            return Err(ValidationError::Field {
                field: "step".into(),
                message: format!("index {} outside 0..{}", k, self.steps()),
            }
            .into());
        }
        if controls.len() != self.ctrl_num() {
            return Err(ValidationError::DimensionMismatch {
                what: "controls".into(),
                expected: self.ctrl_num().to_string(),
                actual: controls.len().to_string(),
            }
            .into());
        }
        let dt = self.tspan[k + 1] - self.tspan[k];
        Ok(self.propagator(dt, controls)?.apply(state)?)
    }

    fn evolve_final(&self, rho0: &Array2<Complex64>, pulses: Option<&Array2<f64>>) -> Result<DynamicsState> {
        self.propagate(rho0, pulses, |_, _| {})
    }
}

fn check_operator(what: &str, op: &Array2<Complex64>, d: usize) -> Result<()> {
    if op.dim() != (d, d) || d == 0 {
        return Err(ValidationError::DimensionMismatch {
            what: what.into(),
            expected: format!("{} × {}", d, d),
            actual: format!("{} × {}", op.nrows(), op.ncols()),
        }
        .into());
    }
    if op.iter().any(|z| !z.is_finite()) {
        return Err(ValidationError::Field {
            field: what.into(),
            message: "contains NaN or Inf".into(),
        }
        .into());
    }
    Ok(())
}

fn controls_at(pulses: Option<&Array2<f64>>, k: usize, ctrl_num: usize) -> Vec<f64> {
    match pulses {
        Some(p) => p.column(k).to_vec(),
        None => vec![0.0; ctrl_num],
    }
}

/// `[[a, b], [0, a]]`
fn upper_block(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let n = a.nrows();
    let mut m = Array2::zeros((2 * n, 2 * n));
    m.slice_mut(s![..n, ..n]).assign(a);
    m.slice_mut(s![..n, n..]).assign(b);
    m.slice_mut(s![n.., n..]).assign(a);
    m
}

/// `[[a, 0], [b, a]]`
fn lower_block(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let n = a.nrows();
    let mut m = Array2::zeros((2 * n, 2 * n));
    m.slice_mut(s![..n, ..n]).assign(a);
    m.slice_mut(s![n.., ..n]).assign(b);
    m.slice_mut(s![n.., n..]).assign(a);
    m
}

/// Superoperator of `ρ ↦ −i[H, ρ]` on row-major `vec(ρ)`.
fn hamiltonian_superoperator(h: &Array2<Complex64>) -> Array2<Complex64> {
    let d = h.nrows();
    let eye = identity(d);
    (kron(h, &eye) - kron(&eye, &h.t().to_owned())) * (-I)
}

/// Superoperator of `D[L](ρ) = γ (L ρ L† − ½ L†L ρ − ½ ρ L†L)` on row-major `vec(ρ)`.
fn dissipator_superoperator(ch: &Decay) -> Array2<Complex64> {
    let l = &ch.operator;
    let d = l.nrows();
    let eye = identity(d);
    let l_dag_l = dagger(l).dot(l);
    let l_conj = l.mapv(|z| z.conj());
    (kron(l, &l_conj) - kron(&l_dag_l, &eye) * c(0.5) - kron(&eye, &l_dag_l.t().to_owned()) * c(0.5))
        * c(ch.rate)
}

/// Direct evaluation of the Lindblad right-hand side.
pub fn lindblad_rhs(
    hamiltonian: &Array2<Complex64>,
    decay: &[Decay],
    rho: &Array2<Complex64>,
) -> Array2<Complex64> {
    // -i[H, ρ]
    let mut out = (hamiltonian.dot(rho) - rho.dot(hamiltonian)) * (-I);
    for ch in decay {
        if ch.rate == 0.0 {
            continue;
        }
        let l = &ch.operator;
        let l_dag = dagger(l);
        let l_dag_l = l_dag.dot(l);
        let jump = l.dot(rho).dot(&l_dag);
        out = out + (&jump - &(l_dag_l.dot(rho) * c(0.5)) - &(rho.dot(&l_dag_l) * c(0.5))) * c(ch.rate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{cfim, qfim, Basis, LdKind};
    use crate::linalg::trace;
    use crate::test_utils::{pauli_x, pauli_z, random_density_matrix, random_hermitian};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
        let step = (stop - start) / (num - 1) as f64;
        (0..num).map(|k| start + step * k as f64).collect()
    }

    fn plus_state() -> Array2<Complex64> {
        Array2::from_elem((2, 2), c(0.5))
    }

    fn minus_projector() -> Array2<Complex64> {
        let mut m = Array2::from_elem((2, 2), c(0.5));
        m[[0, 1]] = c(-0.5);
        m[[1, 0]] = c(-0.5);
        m
    }

    fn assert_close(a: &Array2<Complex64>, b: &Array2<Complex64>, tol: f64) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).norm() < tol, "{:?} vs {:?}", x, y);
        }
    }

    #[test]
    fn test_liouvillian_matches_direct_rhs() {
        let mut rng = StdRng::seed_from_u64(2);
        let h = random_hermitian(3, &mut rng);
        let mut l = Array2::zeros((3, 3));
        l[[0, 1]] = c(1.0);
        l[[1, 2]] = Complex64::new(0.0, 0.7);
        let decay = vec![Decay::new(l, 0.3)];
        let dynamics = Lindblad::new(vec![0.0, 1.0], h.clone(), vec![h.clone()], decay.clone()).unwrap();

        let rho = random_density_matrix(3, &mut rng);
        let via_superop = unvectorize(&dynamics.liouvillian(&h).dot(&vectorize(&rho))).unwrap();
        assert_close(&via_superop, &lindblad_rhs(&h, &decay, &rho), 1e-12);
    }

    #[test]
    fn test_trace_preserved() {
        let dynamics = Lindblad::new(
            linspace(0.0, 5.0, 50),
            pauli_z() * c(0.5),
            vec![pauli_z() * c(0.5)],
            vec![Decay::sigma_plus(0.2), Decay::dephasing(0.1)],
        )
        .unwrap();
        let traj = dynamics.evolve(&plus_state(), None).unwrap();
        assert_eq!(traj.len(), 50);
        for (rho, drho) in traj.rho.iter().zip(traj.drho.iter()) {
            assert_relative_eq!(trace(rho).re, 1.0, epsilon = 1e-12);
            assert!(trace(&drho[0]).norm() < 1e-12);
        }
    }

    #[test]
    fn test_noiseless_and_noise_branches_agree() {
        let mut rng = StdRng::seed_from_u64(4);
        let h0 = random_hermitian(2, &mut rng);
        let dh = vec![pauli_z() * c(0.5), pauli_x()];
        let dynamics = Lindblad::new(vec![0.0, 0.7], h0.clone(), dh, vec![Decay::sigma_minus(0.0)]).unwrap();
        assert!(dynamics.is_noiseless());

        let mut state = dynamics.initial(&random_density_matrix(2, &mut rng));
        state.drho[1] = pauli_z() * c(0.1);

        let unitary = dynamics.unitary_propagator(&h0, 0.7).unwrap().apply(&state).unwrap();
        let superop = dynamics.superoperator_propagator(&h0, 0.7).unwrap().apply(&state).unwrap();
        assert_close(&unitary.rho, &superop.rho, 1e-12);
        for (a, b) in unitary.drho.iter().zip(superop.drho.iter()) {
            assert_close(a, b, 1e-12);
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        // Parameter ω in H0 = ω σz/2 with amplitude damping
        let tspan = linspace(0.0, 3.0, 31);
        let build = |omega: f64| {
            Lindblad::new(
                tspan.clone(),
                pauli_z() * c(0.5 * omega) + pauli_x() * c(0.3),
                vec![pauli_z() * c(0.5)],
                vec![Decay::sigma_plus(0.25)],
            )
            .unwrap()
        };
        let omega = 1.3;
        let h = 1e-5;
        let exact = build(omega).evolve_final(&plus_state(), None).unwrap();
        let up = build(omega + h).evolve_final(&plus_state(), None).unwrap();
        let down = build(omega - h).evolve_final(&plus_state(), None).unwrap();
        let fd = (&up.rho - &down.rho) * c(1.0 / (2.0 * h));
        assert_close(&exact.drho[0], &fd, 1e-8);
    }

    #[test]
    fn test_controls_enter_hamiltonian() {
        let tspan = linspace(0.0, 1.0, 11);
        let dynamics = Lindblad::new(tspan, pauli_z() * c(0.5), vec![pauli_z() * c(0.5)], vec![])
            .unwrap()
            .with_controls(vec![pauli_x()])
            .unwrap();
        assert_eq!(dynamics.ctrl_num(), 1);

        let pulses = Array2::from_elem((1, 10), 0.4);
        let with = dynamics.evolve_final(&plus_state(), Some(&pulses)).unwrap();
        let without = dynamics.evolve_final(&plus_state(), None).unwrap();
        assert!((&with.rho - &without.rho).iter().any(|z| z.norm() > 1e-3));

        // Stepwise evolution reproduces the memoized path
        let mut state = dynamics.initial(&plus_state());
        for k in 0..dynamics.steps() {
            state = dynamics.step(&state, k, &[0.4]).unwrap();
        }
        assert_close(&state.rho, &with.rho, 1e-12);

        let bad = Array2::from_elem((1, 9), 0.4);
        assert!(dynamics.evolve_final(&plus_state(), Some(&bad)).is_err());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(Lindblad::new(vec![0.0], pauli_z(), vec![pauli_z()], vec![]).is_err());
        assert!(Lindblad::new(vec![1.0, 0.0], pauli_z(), vec![pauli_z()], vec![]).is_err());
        assert!(Lindblad::new(vec![0.0, 1.0], pauli_z(), vec![], vec![]).is_err());
        assert!(Lindblad::new(vec![0.0, 1.0], pauli_z(), vec![pauli_z()], vec![Decay::sigma_minus(-1.0)]).is_err());
        assert!(
            Lindblad::new(vec![0.0, 1.0], pauli_z(), vec![Array2::zeros((3, 3))], vec![]).is_err()
        );
    }

    #[test]
    fn test_single_qubit_phase_estimation_reference() {
        // ρ0 = |+⟩⟨+|, H0 = ωσz/2, decay |1⟩⟨0| at γ = 0.1
        let gamma = 0.1;
        let omega = 1.0;
        let tspan = linspace(0.0, 50.0, 2000);
        let dynamics = Lindblad::new(
            tspan.clone(),
            pauli_z() * c(0.5 * omega),
            vec![pauli_z() * c(0.5)],
            vec![Decay::sigma_minus(0.0), Decay::sigma_plus(gamma)],
        )
        .unwrap();
        let traj = dynamics.evolve(&plus_state(), None).unwrap();
        assert_eq!(traj.len(), 2000);

        let povm = vec![plus_state(), minus_projector()];
        for &k in &[1usize, 400, 1000, 1999] {
            let t = tspan[k];
            let decay = (-gamma * t).exp();
            let qfi_ref = t * t * decay;
            let sin2 = (omega * t).sin().powi(2);
            let cos2 = (omega * t).cos().powi(2);
            let cfi_ref = t * t * decay * sin2 / (1.0 - decay * cos2);

            let qfi = qfim(&traj.rho[k], &traj.drho[k], LdKind::Sld, Basis::Original, 1e-8)
                .unwrap()
                .as_scalar()
                .unwrap();
            let cfi = cfim(&traj.rho[k], &traj.drho[k], &povm, 1e-8)
                .unwrap()
                .as_scalar()
                .unwrap();
            assert_relative_eq!(qfi, qfi_ref, epsilon = 1e-6);
            assert_relative_eq!(cfi, cfi_ref, epsilon = 1e-6);
        }
    }
}
