// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Nelder-Mead simplex search, maximizing.
//!
//! Each episode transforms the worst vertex once: reflection (`ar`),
//! expansion (`ae`), contraction (`ac`), or, failing those, shrinks the
//! simplex toward the best vertex (`as0`).

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, trace};

use super::seed_population;
use super::tracker::RunTracker;
use super::types::{Candidate, OptimizationResult, Optimizer};
use crate::config::NmConfig;
use crate::error::Result;
use crate::objective::Objective;

pub struct NelderMead {
    objective: Box<dyn Objective>,
    config: NmConfig,
    initial: Vec<Vec<f64>>,
    rng: StdRng,
}

impl NelderMead {
    pub fn new(objective: Box<dyn Objective>, config: NmConfig, initial: &[Candidate]) -> Result<Self> {
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

/// `from + coeff · (to − from)`
fn along(from: &[f64], to: &[f64], coeff: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + coeff * (b - a)).collect()
}

impl Optimizer for NelderMead {
    fn name(&self) -> &'static str {
        "NM"
    }

    fn run(&mut self) -> Result<OptimizationResult> {
        let objective = self.objective.as_ref();
        let space = objective.space();
        let cfg = &self.config;

        let mut vertices = seed_population(space, &self.initial, cfg.state_num, &mut self.rng);
        let n = space.dimension();

        info!(
            method = "NM",
            objective = %objective.bound(),
            target = space.name(),
            vertices = cfg.state_num,
            episodes = cfg.max_episode,
            "Starting optimization"
        );

        let mut tracker = RunTracker::new("NM", cfg.max_duration_sec, cfg.save_all);
        let mut values = Vec::with_capacity(vertices.len());
        for x in &vertices {
            values.push(tracker.evaluate(objective, x)?);
        }

        for _ in 0..cfg.max_episode {
            // Best first
            let mut order: Vec<usize> = (0..vertices.len()).collect();
            order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
            let best = order[0];
            let worst = order[order.len() - 1];
            let second_worst = order[order.len() - 2];

            let mut centroid = vec![0.0; n];
            for &i in &order[..order.len() - 1] {
                for (c, x) in centroid.iter_mut().zip(&vertices[i]) {
                    *c += x;
                }
            }
            let m = (order.len() - 1) as f64;
            centroid.iter_mut().for_each(|c| *c /= m);

            let mut reflected = along(&centroid, &vertices[worst], -cfg.ar);
            space.project(&mut reflected);
            let f_reflected = tracker.evaluate(objective, &reflected)?;

            if f_reflected > values[best] {
                let mut expanded = along(&centroid, &reflected, cfg.ae);
                space.project(&mut expanded);
                let f_expanded = tracker.evaluate(objective, &expanded)?;
                if f_expanded > f_reflected {
                    trace!("expand");
                    vertices[worst] = expanded;
                    values[worst] = f_expanded;
                } else {
                    trace!("reflect");
                    vertices[worst] = reflected;
                    values[worst] = f_reflected;
                }
            } else if f_reflected > values[second_worst] {
                trace!("reflect");
                vertices[worst] = reflected;
                values[worst] = f_reflected;
            } else {
                let outside = f_reflected > values[worst];
                let mut contracted = if outside {
                    along(&centroid, &reflected, cfg.ac)
                } else {
                    along(&centroid, &vertices[worst], cfg.ac)
                };
                space.project(&mut contracted);
                let f_contracted = tracker.evaluate(objective, &contracted)?;
                let threshold = if outside { f_reflected } else { values[worst] };

                if f_contracted > threshold || (outside && f_contracted == threshold) {
                    trace!(outside, "contract");
                    vertices[worst] = contracted;
                    values[worst] = f_contracted;
                } else {
                    trace!("shrink");
                    let anchor = vertices[best].clone();
                    for i in 0..vertices.len() {
                        if i == best {
                            continue;
                        }
                        let mut shrunk = along(&anchor, &vertices[i], cfg.as0);
                        space.project(&mut shrunk);
                        values[i] = tracker.evaluate(objective, &shrunk)?;
                        vertices[i] = shrunk;
                    }
                }
            }

            let (best_x, best_value) = tracker.best();
            let best_x = best_x.to_vec();
            if !tracker.end_episode(best_value, &best_x) {
                break;
            }
        }

        tracker.finish(space, cfg.max_episode)
    }
}
