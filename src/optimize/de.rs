// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Differential evolution (rand/1/bin).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::seed_population;
use super::tracker::RunTracker;
use super::types::{Candidate, OptimizationResult, Optimizer};
use crate::config::DeConfig;
use crate::error::Result;
use crate::objective::Objective;

pub struct DifferentialEvolution {
    objective: Box<dyn Objective>,
    config: DeConfig,
    initial: Vec<Vec<f64>>,
    rng: StdRng,
}

impl DifferentialEvolution {
    pub fn new(objective: Box<dyn Objective>, config: DeConfig, initial: &[Candidate]) -> Result<Self> {
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

/// Three distinct indices, all different from `target`.
fn pick_three(rng: &mut StdRng, n: usize, target: usize) -> [usize; 3] {
    let mut picked = [target; 3];
    for k in 0..3 {
        loop {
            let r = rng.gen_range(0..n);
            if r != target && !picked[..k].contains(&r) {
                picked[k] = r;
                break;
            }
        }
    }
    picked
}

impl Optimizer for DifferentialEvolution {
    fn name(&self) -> &'static str {
        "DE"
    }

    fn run(&mut self) -> Result<OptimizationResult> {
        let objective = self.objective.as_ref();
        let space = objective.space();
        let cfg = &self.config;
        let rng = &mut self.rng;

        let mut population = seed_population(space, &self.initial, cfg.popsize, rng);
        let n = space.dimension();

        info!(
            method = "DE",
            objective = %objective.bound(),
            target = space.name(),
            popsize = cfg.popsize,
            episodes = cfg.max_episode,
            "Starting optimization"
        );

        let mut tracker = RunTracker::new("DE", cfg.max_duration_sec, cfg.save_all);
        let mut values = Vec::with_capacity(population.len());
        for x in &population {
            values.push(tracker.evaluate(objective, x)?);
        }

        for _ in 0..cfg.max_episode {
            for i in 0..population.len() {
                let [a, b, c] = pick_three(rng, population.len(), i);
                let forced = rng.gen_range(0..n);
                let mut trial = population[i].clone();
                for j in 0..n {
                    if j == forced || rng.gen::<f64>() < cfg.cr {
                        trial[j] = population[a][j] + cfg.c * (population[b][j] - population[c][j]);
                    }
                }
                space.project(&mut trial);

                let value = tracker.evaluate(objective, &trial)?;
                if value >= values[i] {
                    population[i] = trial;
                    values[i] = value;
                }
            }

            let (best, best_value) = tracker.best();
            let best = best.to_vec();
            if !tracker.end_episode(best_value, &best) {
                break;
            }
        }

        tracker.finish(space, cfg.max_episode)
    }
}
