// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Optimization core.
//!
//! All methods share one contract: they are built from an objective, an
//! algorithm config (episode budget, seed, coefficients) and optional
//! initial candidates, and [`Optimizer::run`] returns the best candidate
//! with a per-episode objective trace.
//!
//! | Method | Type | Trace |
//! |--------|------|-------|
//! | [`GradientAscent`] (AD) | finite-difference gradient, plain or Adam | may decrease |
//! | [`Pso`] | particle swarm with periodic reset | non-decreasing |
//! | [`DifferentialEvolution`] | rand/1/bin | non-decreasing |
//! | [`NelderMead`] | simplex | non-decreasing |
//! | [`Ddpg`] | actor-critic over control steps | may decrease |
//!
//! Runs are deterministic for a given seed: every optimizer owns one
//! `StdRng` and evaluates candidates in population order.

mod adam;
pub mod ddpg;
pub mod de;
pub mod gradient;
pub mod nelder_mead;
mod network;
pub mod pso;
mod tracker;
pub mod types;

pub use ddpg::Ddpg;
pub use de::DifferentialEvolution;
pub use gradient::GradientAscent;
pub use nelder_mead::NelderMead;
pub use pso::Pso;
pub use types::{Candidate, OptimizationResult, Optimizer, RunRecord, SearchSpace};

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::error::{Result, ValidationError};
use crate::objective::Objective;

/// Optimization method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Ad,
    Pso,
    De,
    Nm,
    Ddpg,
}

impl Method {
    /// Seed of this method's config section.
    pub fn seed(&self, config: &Config) -> u64 {
        match self {
            Method::Ad => config.ad.seed,
            Method::Pso => config.pso.seed,
            Method::De => config.de.seed,
            Method::Nm => config.nm.seed,
            Method::Ddpg => config.ddpg.seed,
        }
    }

    /// Whether this method's config asks for per-episode candidates.
    pub fn save_all(&self, config: &Config) -> bool {
        match self {
            Method::Ad => config.ad.save_all,
            Method::Pso => config.pso.save_all,
            Method::De => config.de.save_all,
            Method::Nm => config.nm.save_all,
            Method::Ddpg => config.ddpg.save_all,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Ad => write!(f, "AD"),
            Method::Pso => write!(f, "PSO"),
            Method::De => write!(f, "DE"),
            Method::Nm => write!(f, "NM"),
            Method::Ddpg => write!(f, "DDPG"),
        }
    }
}

impl FromStr for Method {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ad" => Ok(Method::Ad),
            "pso" => Ok(Method::Pso),
            "de" => Ok(Method::De),
            "nm" => Ok(Method::Nm),
            "ddpg" => Ok(Method::Ddpg),
            _ => Err(ValidationError::UnknownVariant {
                field: "method".into(),
                value: s.into(),
                expected: "{AD, PSO, DE, NM, DDPG}".into(),
            }),
        }
    }
}

/// Build an optimizer from the matching config section.
///
/// AD and DDPG take at most one initial candidate; extras are ignored.
pub fn build(
    method: Method,
    objective: Box<dyn Objective>,
    config: &Config,
    initial: &[Candidate],
) -> Result<Box<dyn Optimizer>> {
    Ok(match method {
        Method::Ad => Box::new(GradientAscent::new(objective, config.ad.clone(), initial.first())?),
        Method::Pso => Box::new(Pso::new(objective, config.pso.clone(), initial)?),
        Method::De => Box::new(DifferentialEvolution::new(objective, config.de.clone(), initial)?),
        Method::Nm => Box::new(NelderMead::new(objective, config.nm.clone(), initial)?),
        Method::Ddpg => {
            if !initial.is_empty() {
                warn!("DDPG learns its own pulses; initial candidates are ignored");
            }
            Box::new(Ddpg::new(objective, config.ddpg.clone())?)
        }
    })
}

/// Methods able to drive `objective`, other than `excluded`.
pub(crate) fn alternatives(objective: &dyn Objective, excluded: &str) -> Vec<String> {
    let mut methods = Vec::new();
    if objective.differentiable() {
        methods.push("AD");
    }
    methods.extend(["PSO", "DE", "NM"]);
    if objective.sequential().is_some() {
        methods.push("DDPG");
    }
    methods
        .into_iter()
        .filter(|m| *m != excluded)
        .map(String::from)
        .collect()
}

/// Initial candidates first, then random points, all projected.
pub(crate) fn seed_population(
    space: &SearchSpace,
    initial: &[Vec<f64>],
    size: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    if initial.len() > size {
        warn!(
            given = initial.len(),
            used = size,
            "More initial candidates than population slots"
        );
    }
    (0..size)
        .map(|i| {
            let mut x = match initial.get(i) {
                Some(x) => x.clone(),
                None => space.random(rng),
            };
            space.project(&mut x);
            x
        })
        .collect()
}
