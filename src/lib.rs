// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS Metrology
//!
//! Precision bounds for quantum parameter estimation and the optimizers
//! that push them: probe states, measurements and control pulses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Optimizers (AD, PSO, DE,         │
//! │            NM, DDPG)                    │
//! ├─────────────────────────────────────────┤
//! │   Objective adapter (target + bound)    │
//! ├──────────────────┬──────────────────────┤
//! │   Dynamics       │   Measurements       │
//! │ (Lindblad/Kraus) │   (POVM params)      │
//! ├──────────────────┴──────────────────────┤
//! │  Bounds: CFIM, QFIM (SLD/RLD/LLD), HCRB │
//! ├─────────────────────────────────────────┤
//! │   Linear algebra (faer eigh, Padé expm) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`bounds`]: Fisher information and the Holevo bound
//! - [`dynamics`]: Parameterized Lindblad and Kraus evolution
//! - [`measurement`]: POVM parameterizations
//! - [`objective`]: Scalar figures of merit for optimization
//! - [`optimize`]: Optimization methods and run records
//! - [`problem`]: YAML problem files
//! - [`config`]: Configuration management
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod bounds;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod linalg;
pub mod measurement;
pub mod objective;
pub mod optimize;
pub mod problem;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
