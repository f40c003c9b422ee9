// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fisher-information engine.
//!
//! Computes the asymptotic precision bounds consumed by the optimizers:
//!
//! - [`cfim`]: classical Fisher information of a POVM
//! - [`sld`], [`rld`], [`lld`]: logarithmic derivatives
//! - [`qfim`]: quantum Fisher information (SLD, RLD or LLD based)
//! - [`holevo_bound`]: Holevo Cramér-Rao bound
//!
//! All functions are pure; the single `accuracy` threshold decides which
//! near-zero probabilities and eigenvalue denominators are dropped.

pub mod cramer_rao;
pub mod holevo;
pub mod types;

pub use cramer_rao::{cfim, lld, logarithmic_derivatives, purity, qfim, qfim_with_ld, rld, sld};
pub use holevo::holevo_bound;
pub use types::{Basis, HolevoBound, Information, LdKind};

/// Default threshold for dropping near-zero denominators.
pub const DEFAULT_ACCURACY: f64 = 1e-8;
