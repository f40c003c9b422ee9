// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gradient ascent (AD) with an optional Adam step.
//!
//! The gradient is taken by central differences through the full
//! candidate → dynamics → bound pipeline. The Holevo bound is rejected
//! at construction.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use super::adam::Adam;
use super::tracker::RunTracker;
use super::types::{Candidate, OptimizationResult, Optimizer};
use super::alternatives;
use crate::config::AdConfig;
use crate::error::{Error, Result};
use crate::objective::Objective;

pub struct GradientAscent {
    objective: Box<dyn Objective>,
    config: AdConfig,
    initial: Option<Vec<f64>>,
    rng: StdRng,
}

impl GradientAscent {
    pub fn new(objective: Box<dyn Objective>, config: AdConfig, initial: Option<&Candidate>) -> Result<Self> {
        config.validate()?;
        if !objective.differentiable() {
            return Err(Error::UnsupportedMethod {
                method: "AD".into(),
                objective: objective.bound().to_string(),
                alternatives: alternatives(objective.as_ref(), "AD"),
            });
        }
        let initial = initial.map(|c| objective.space().encode(c)).transpose()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            objective,
            config,
            initial,
            rng,
        })
    }
}

impl Optimizer for GradientAscent {
    fn name(&self) -> &'static str {
        "AD"
    }

    fn run(&mut self) -> Result<OptimizationResult> {
        let objective = self.objective.as_ref();
        let space = objective.space();
        let cfg = &self.config;

        let mut x = match &self.initial {
            Some(x) => x.clone(),
            None => space.random(&mut self.rng),
        };
        space.project(&mut x);

        info!(
            method = "AD",
            objective = %objective.bound(),
            target = space.name(),
            dimension = x.len(),
            max_episode = cfg.max_episode,
            adam = cfg.adam,
            "Starting optimization"
        );

        let mut tracker = RunTracker::new("AD", cfg.max_duration_sec, cfg.save_all);
        let mut adam = Adam::new(x.len(), cfg.epsilon, cfg.beta1, cfg.beta2, cfg.eps);
        let mut value = tracker.evaluate(objective, &x)?;

        for _ in 0..cfg.max_episode {
            if let Some(grad) = tracker.guard(objective.gradient(&x, cfg.fd_step))? {
                if cfg.adam {
                    adam.apply(x.iter_mut(), grad.iter(), 1.0);
                } else {
                    for (xi, g) in x.iter_mut().zip(grad.iter()) {
                        *xi += cfg.epsilon * g;
                    }
                }
                space.project(&mut x);
                value = tracker.evaluate(objective, &x)?;
            }
            if !tracker.end_episode(value, &x) {
                break;
            }
        }

        tracker.finish(space, cfg.max_episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::LdKind;
    use crate::dynamics::{Decay, Lindblad};
    use crate::linalg::c;
    use crate::objective::{BoundKind, ObjectiveOptions, StateObjective};
    use crate::test_utils::pauli_z;

    fn two_parameter_dynamics() -> Lindblad {
        let tspan: Vec<f64> = (0..=10).map(|k| k as f64 * 0.1).collect();
        let dh = vec![pauli_z() * c(0.5), crate::test_utils::pauli_x() * c(0.5)];
        Lindblad::new(tspan, pauli_z() * c(0.5), dh, vec![Decay::dephasing(0.1)]).unwrap()
    }

    fn phase_objective() -> Box<dyn Objective> {
        let tspan: Vec<f64> = (0..=10).map(|k| k as f64 * 0.1).collect();
        let dynamics =
            Lindblad::new(tspan, pauli_z() * c(0.5), vec![pauli_z() * c(0.5)], vec![Decay::dephasing(0.1)])
                .unwrap();
        Box::new(StateObjective::new(dynamics, BoundKind::Qfim(LdKind::Sld), ObjectiveOptions::default()).unwrap())
    }

    #[test]
    fn test_ad_rejects_holevo_objective() {
        let objective =
            StateObjective::new(two_parameter_dynamics(), BoundKind::Hcrb, ObjectiveOptions::default()).unwrap();
        let err = GradientAscent::new(Box::new(objective), AdConfig::default(), None)
            .err()
            .unwrap();
        let msg = err.to_string();
        assert!(msg.contains("AD is not available when the objective function is HCRB"));
        assert!(msg.contains("PSO, DE, NM"));
        assert!(matches!(err, Error::UnsupportedMethod { .. }));
    }

    #[test]
    fn test_ad_improves_probe_state() {
        let config = AdConfig {
            max_episode: 40,
            epsilon: 0.05,
            adam: true,
            ..Default::default()
        };
        let mut ad = GradientAscent::new(phase_objective(), config, None).unwrap();
        let result = ad.run().unwrap();
        assert_eq!(result.method, "AD");
        assert_eq!(result.trace.len(), 40);
        assert!(result.best_value >= result.trace[0]);
        // Phase QFI at t = 1 is bounded by t² = 1
        assert!(result.best_value <= 1.0 + 1e-9);
        assert!(result.faulted_episodes.is_empty());
    }

    #[test]
    fn test_ad_respects_initial_candidate() {
        let s = 1.0 / 2f64.sqrt();
        let psi = ndarray::Array1::from(vec![c(s), c(s)]);
        let config = AdConfig {
            max_episode: 3,
            ..Default::default()
        };
        let mut ad = GradientAscent::new(phase_objective(), config, Some(&Candidate::State(psi))).unwrap();
        let result = ad.run().unwrap();
        // Starting at the optimum, the plain step stays there
        let expected = phase_objective().evaluate(&[s, 0.0, s, 0.0]).unwrap();
        assert!((result.best_value - expected).abs() < 1e-6);
    }
}
