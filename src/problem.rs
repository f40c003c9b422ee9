// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! YAML problem files for the CLI.
//!
//! Matrices are row lists; each entry is either a real number or a
//! `[re, im]` pair:
//!
//! ```yaml
//! tspan: {start: 0.0, stop: 50.0, num: 2000}
//! rho0: [[0.5, 0.5], [0.5, 0.5]]
//! H0: [[0.5, 0.0], [0.0, -0.5]]
//! dH: [[[0.5, 0.0], [0.0, -0.5]]]
//! decay:
//!   - operator: [[0.0, 0.0], [1.0, 0.0]]
//!     rate: 0.1
//! objective: QFIM
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::Deserialize;

use crate::bounds::LdKind;
use crate::dynamics::{Decay, Dynamics, Lindblad};
use crate::error::{Result, ValidationError};
use crate::measurement::MeasurementParam;
use crate::objective::{
    BoundKind, ControlObjective, MeasurementObjective, Objective, ObjectiveOptions, StateObjective,
};
use crate::optimize::Candidate;

/// One matrix entry.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Real(f64),
    Complex([f64; 2]),
}

impl From<Entry> for Complex64 {
    fn from(e: Entry) -> Self {
        match e {
            Entry::Real(re) => Complex64::new(re, 0.0),
            Entry::Complex([re, im]) => Complex64::new(re, im),
        }
    }
}

type MatrixRows = Vec<Vec<Entry>>;

fn to_matrix(field: &str, rows: &MatrixRows) -> Result<Array2<Complex64>> {
    let n = rows.len();
    let m = rows.first().map_or(0, Vec::len);
    if n == 0 || rows.iter().any(|r| r.len() != m) {
        return Err(ValidationError::Field {
            field: field.into(),
            message: "must be a non-empty rectangular matrix".into(),
        }
        .into());
    }
    Ok(Array2::from_shape_fn((n, m), |(i, j)| rows[i][j].into()))
}

fn to_matrices(field: &str, list: &[MatrixRows]) -> Result<Vec<Array2<Complex64>>> {
    list.iter()
        .enumerate()
        .map(|(k, rows)| to_matrix(&format!("{}[{}]", field, k), rows))
        .collect()
}

/// Time grid: explicit points or an evenly spaced range.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimeGrid {
    Points(Vec<f64>),
    Linspace { start: f64, stop: f64, num: usize },
}

impl TimeGrid {
    pub fn points(&self) -> Vec<f64> {
        match self {
            TimeGrid::Points(t) => t.clone(),
            TimeGrid::Linspace { start, stop, num } => match num {
                0 => Vec::new(),
                1 => vec![*start],
                n => {
                    let step = (stop - start) / (*n - 1) as f64;
                    (0..*n).map(|k| start + step * k as f64).collect()
                }
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecaySpec {
    pub operator: MatrixRows,
    pub rate: f64,
}

/// What an `optimize` run searches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    State,
    Measurement,
    Control,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::State => write!(f, "state"),
            Target::Measurement => write!(f, "measurement"),
            Target::Control => write!(f, "control"),
        }
    }
}

impl FromStr for Target {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "state" => Ok(Target::State),
            "measurement" => Ok(Target::Measurement),
            "control" => Ok(Target::Control),
            _ => Err(ValidationError::UnknownVariant {
                field: "target".into(),
                value: s.into(),
                expected: "{state, measurement, control}".into(),
            }),
        }
    }
}

/// A Lindblad estimation problem.
#[derive(Debug, Clone, Deserialize)]
pub struct Problem {
    pub tspan: TimeGrid,

    #[serde(default)]
    pub rho0: Option<MatrixRows>,

    #[serde(rename = "H0")]
    pub h0: MatrixRows,

    #[serde(rename = "dH")]
    pub dh: Vec<MatrixRows>,

    #[serde(default)]
    pub decay: Vec<DecaySpec>,

    /// Control Hamiltonians
    #[serde(default, rename = "Hc")]
    pub hc: Vec<MatrixRows>,

    /// Amplitude bound `[lo, hi]`; unbounded when absent
    #[serde(default)]
    pub ctrl_bound: Option<[f64; 2]>,

    /// QFIM, CFIM or HCRB
    #[serde(default = "default_objective")]
    pub objective: String,

    /// POVM for CFIM, or the fixed POVM of LC / rotation measurements
    #[serde(default, rename = "M")]
    pub povm: Option<Vec<MatrixRows>>,

    /// Weight matrix
    #[serde(default, rename = "W")]
    pub weight: Option<Vec<Vec<f64>>>,

    /// Measurement parameterization: projection, LC or rotation
    #[serde(default = "default_mtype")]
    pub mtype: String,

    /// Outcome count for LC measurements
    #[serde(default)]
    pub outcomes: Option<usize>,

    /// Initial probe states
    #[serde(default)]
    pub psi0: Vec<Vec<Entry>>,

    /// Initial pulses, each `ctrl_num × steps`
    #[serde(default)]
    pub ctrl0: Vec<Vec<Vec<f64>>>,
}

fn default_objective() -> String {
    "QFIM".into()
}

fn default_mtype() -> String {
    "projection".into()
}

impl Problem {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&content)?)
    }

    pub fn dynamics(&self) -> Result<Lindblad> {
        let decay = self
            .decay
            .iter()
            .enumerate()
            .map(|(k, d)| Ok(Decay::new(to_matrix(&format!("decay[{}]", k), &d.operator)?, d.rate)))
            .collect::<Result<Vec<_>>>()?;
        let dynamics = Lindblad::new(
            self.tspan.points(),
            to_matrix("H0", &self.h0)?,
            to_matrices("dH", &self.dh)?,
            decay,
        )?;
        if self.hc.is_empty() {
            Ok(dynamics)
        } else {
            dynamics.with_controls(to_matrices("Hc", &self.hc)?)
        }
    }

    pub fn rho0(&self) -> Result<Array2<Complex64>> {
        match &self.rho0 {
            Some(rows) => to_matrix("rho0", rows),
            None => Err(ValidationError::Field {
                field: "rho0".into(),
                message: "required for this command".into(),
            }
            .into()),
        }
    }

    /// Objective kind; QFIM uses `ld` as its logarithmic derivative.
    pub fn bound_kind(&self, ld: LdKind) -> Result<BoundKind> {
        Ok(match self.objective.parse::<BoundKind>()? {
            BoundKind::Qfim(_) => BoundKind::Qfim(ld),
            other => other,
        })
    }

    pub fn povm(&self) -> Result<Option<Vec<Array2<Complex64>>>> {
        self.povm.as_deref().map(|m| to_matrices("M", m)).transpose()
    }

    pub fn options(&self, accuracy: f64) -> Result<ObjectiveOptions> {
        let weight = match &self.weight {
            Some(rows) => {
                let n = rows.len();
                let flat: Vec<f64> = rows.iter().flatten().copied().collect();
                Some(Array2::from_shape_vec((n, flat.len() / n.max(1)), flat).map_err(|e| {
                    ValidationError::Field {
                        field: "W".into(),
                        message: e.to_string(),
                    }
                })?)
            }
            None => None,
        };
        Ok(ObjectiveOptions {
            weight,
            povm: self.povm()?,
            accuracy,
        })
    }

    fn fixed_basis(&self) -> Result<Vec<Array2<Complex64>>> {
        match self.povm()? {
            Some(basis) => Ok(basis),
            None => Err(ValidationError::Field {
                field: "M".into(),
                message: format!("required for '{}' measurements", self.mtype),
            }
            .into()),
        }
    }

    fn measurement_param(&self) -> Result<MeasurementParam> {
        match self.mtype.as_str() {
            "projection" => Ok(MeasurementParam::Projective),
            "LC" | "lc" => {
                let basis = self.fixed_basis()?;
                let outcomes = self.outcomes.unwrap_or(basis.len());
                Ok(MeasurementParam::LinearCombination { basis, outcomes })
            }
            "rotation" => Ok(MeasurementParam::Rotation {
                basis: self.fixed_basis()?,
            }),
            other => Err(ValidationError::UnknownVariant {
                field: "mtype".into(),
                value: other.into(),
                expected: "{projection, LC, rotation}".into(),
            }
            .into()),
        }
    }

    /// Objective for the given optimization target.
    pub fn objective(&self, target: Target, ld: LdKind, accuracy: f64) -> Result<Box<dyn Objective>> {
        let kind = self.bound_kind(ld)?;
        let mut options = self.options(accuracy)?;
        let dynamics = self.dynamics()?;
        Ok(match target {
            Target::State => Box::new(StateObjective::new(dynamics, kind, options)?),
            Target::Control => {
                let bound = self
                    .ctrl_bound
                    .map_or((f64::NEG_INFINITY, f64::INFINITY), |[lo, hi]| (lo, hi));
                Box::new(ControlObjective::new(dynamics, self.rho0()?, kind, bound, options)?)
            }
            Target::Measurement => {
                let param = self.measurement_param()?;
                // The fixed POVM parameterizes the measurement, it is not a CFIM POVM
                options.povm = None;
                let out = dynamics.evolve_final(&self.rho0()?, None)?;
                Box::new(MeasurementObjective::new(out.rho, out.drho, param, options)?)
            }
        })
    }

    /// Initial candidates for the given target.
    pub fn initial_candidates(&self, target: Target) -> Result<Vec<Candidate>> {
        match target {
            Target::State => Ok(self
                .psi0
                .iter()
                .map(|psi| Candidate::State(psi.iter().map(|e| Complex64::from(*e)).collect::<Array1<_>>()))
                .collect()),
            Target::Control => self
                .ctrl0
                .iter()
                .enumerate()
                .map(|(k, rows)| {
                    let n = rows.len();
                    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
                    Array2::from_shape_vec((n, flat.len() / n.max(1)), flat)
                        .map(Candidate::Control)
                        .map_err(|e| {
                            ValidationError::Field {
                                field: format!("ctrl0[{}]", k),
                                message: e.to_string(),
                            }
                            .into()
                        })
                })
                .collect(),
            Target::Measurement => Ok(Vec::new()),
        }
    }
}
