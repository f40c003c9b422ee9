// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Particle swarm optimization.
//!
//! Velocity update per coordinate:
//!   v ← c0·v + c1·r1·(p_best − x) + c2·r2·(g_best − x)
//!
//! The budget `[total, period]` runs `total` episodes and resets every
//! particle to the global best each `period` episodes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::seed_population;
use super::tracker::RunTracker;
use super::types::{Candidate, OptimizationResult, Optimizer};
use crate::config::PsoConfig;
use crate::error::Result;
use crate::objective::Objective;

pub struct Pso {
    objective: Box<dyn Objective>,
    config: PsoConfig,
    initial: Vec<Vec<f64>>,
    rng: StdRng,
}

impl Pso {
    pub fn new(objective: Box<dyn Objective>, config: PsoConfig, initial: &[Candidate]) -> Result<Self> {
        config.validate()?;
        let initial = initial
            .iter()
            .map(|c| objective.space().encode(c))
            .collect::<Result<Vec<_>>>()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            objective,
            config,
            initial,
            rng,
        })
    }
}

impl Optimizer for Pso {
    fn name(&self) -> &'static str {
        "PSO"
    }

    fn run(&mut self) -> Result<OptimizationResult> {
        let objective = self.objective.as_ref();
        let space = objective.space();
        let cfg = &self.config;
        let rng = &mut self.rng;
        let [total, period] = cfg.max_episode;

        let mut positions = seed_population(space, &self.initial, cfg.particle_num, rng);
        let mut velocities: Vec<Vec<f64>> = positions
            .iter()
            .map(|x| x.iter().map(|_| 0.1 * rng.gen::<f64>()).collect())
            .collect();

        info!(
            method = "PSO",
            objective = %objective.bound(),
            target = space.name(),
            particles = cfg.particle_num,
            episodes = total,
            restart_period = period,
            "Starting optimization"
        );

        let mut tracker = RunTracker::new("PSO", cfg.max_duration_sec, cfg.save_all);
        let mut personal_best = positions.clone();
        let mut personal_value = Vec::with_capacity(positions.len());
        for x in &positions {
            personal_value.push(tracker.evaluate(objective, x)?);
        }

        for episode in 0..total {
            let global_best = tracker.best().0.to_vec();
            if episode > 0 && episode % period == 0 {
                debug!(episode, "Resetting swarm to the global best");
                for x in positions.iter_mut() {
                    x.clone_from(&global_best);
                }
            }

            for i in 0..positions.len() {
                let x = &mut positions[i];
                let v = &mut velocities[i];
                for j in 0..x.len() {
                    let r1: f64 = rng.gen();
                    let r2: f64 = rng.gen();
                    v[j] = cfg.c0 * v[j]
                        + cfg.c1 * r1 * (personal_best[i][j] - x[j])
                        + cfg.c2 * r2 * (global_best[j] - x[j]);
                    x[j] += v[j];
                }
                space.project(x);

                let value = tracker.evaluate(objective, x)?;
                if value > personal_value[i] {
                    personal_value[i] = value;
                    personal_best[i].clone_from(x);
                }
            }

            let (best, best_value) = tracker.best();
            let best = best.to_vec();
            if !tracker.end_episode(best_value, &best) {
                break;
            }
        }

        tracker.finish(space, total)
    }
}
