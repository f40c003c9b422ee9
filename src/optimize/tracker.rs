// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bookkeeping shared by every optimizer: best-so-far, per-episode trace,
//! numerical fault flags and the wall-clock cutoff.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::types::{OptimizationResult, SearchSpace};
use crate::error::Result;
use crate::objective::Objective;

pub(crate) struct RunTracker {
    method: &'static str,
    started: Instant,
    max_duration: Option<Duration>,
    save_all: bool,
    best_x: Vec<f64>,
    best_value: f64,
    best_episode: usize,
    trace: Vec<f64>,
    faulted: Vec<usize>,
    episode_faulted: bool,
    candidates: Vec<Vec<f64>>,
}

impl RunTracker {
    pub(crate) fn new(method: &'static str, max_duration_sec: Option<f64>, save_all: bool) -> Self {
        Self {
            method,
            started: Instant::now(),
            max_duration: max_duration_sec.map(Duration::from_secs_f64),
            save_all,
            best_x: Vec::new(),
            best_value: f64::NEG_INFINITY,
            best_episode: 0,
            trace: Vec::new(),
            faulted: Vec::new(),
            episode_faulted: false,
            candidates: Vec::new(),
        }
    }

    /// Index of the episode in progress.
    pub(crate) fn episode(&self) -> usize {
        self.trace.len()
    }

    /// Turn a recoverable numerical fault into `None` and flag the episode;
    /// any other error aborts the run.
    pub(crate) fn guard<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_recoverable() => {
                warn!(
                    method = self.method,
                    episode = self.episode(),
                    error = %e,
                    "Candidate valued as non-improving"
                );
                self.episode_faulted = true;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Evaluate `x`, offer it as a best candidate and return its value.
    /// Faulted candidates are worth `-inf`.
    pub(crate) fn evaluate(&mut self, objective: &dyn Objective, x: &[f64]) -> Result<f64> {
        let value = self
            .guard(objective.evaluate(x))?
            .unwrap_or(f64::NEG_INFINITY);
        self.offer(x, value);
        Ok(value)
    }

    pub(crate) fn offer(&mut self, x: &[f64], value: f64) {
        if self.best_x.is_empty() || value > self.best_value {
            self.best_x = x.to_vec();
            self.best_value = value;
            self.best_episode = self.episode();
        }
    }

    pub(crate) fn best(&self) -> (&[f64], f64) {
        (&self.best_x, self.best_value)
    }

    /// Close the current episode. Returns `false` once the wall-clock
    /// budget is exhausted.
    pub(crate) fn end_episode(&mut self, value: f64, current: &[f64]) -> bool {
        let episode = self.episode();
        if self.episode_faulted {
            self.faulted.push(episode);
            self.episode_faulted = false;
        }
        self.trace.push(value);
        if self.save_all {
            self.candidates.push(current.to_vec());
        }
        debug!(
            method = self.method,
            episode,
            value,
            best = self.best_value,
            "Episode complete"
        );

        match self.max_duration {
            Some(limit) if self.started.elapsed() >= limit => {
                info!(
                    method = self.method,
                    episode,
                    elapsed_sec = self.started.elapsed().as_secs_f64(),
                    "Wall-clock budget exhausted"
                );
                false
            }
            _ => true,
        }
    }

    pub(crate) fn finish(mut self, space: &SearchSpace, max_episode: usize) -> Result<OptimizationResult> {
        if self.episode_faulted {
            // Faults after the last closed episode belong to it
            let last = self.trace.len().saturating_sub(1);
            if self.faulted.last() != Some(&last) {
                self.faulted.push(last);
            }
        }

        let best = space.decode(&self.best_x)?;
        let candidates = self
            .candidates
            .iter()
            .filter_map(|x| space.decode(x).ok())
            .collect();
        let episodes = self.trace.len();

        info!(
            method = self.method,
            episodes,
            best_value = self.best_value,
            best_episode = self.best_episode,
            faulted = self.faulted.len(),
            elapsed_sec = self.started.elapsed().as_secs_f64(),
            "Optimization finished"
        );

        Ok(OptimizationResult {
            method: self.method.to_string(),
            best,
            best_value: self.best_value,
            best_episode: self.best_episode,
            trace: self.trace,
            faulted_episodes: self.faulted,
            episodes,
            terminated_early: episodes < max_episode,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NumericalError;
    use crate::objective::BoundKind;

    /// Quadratic bowl with a singular hole at the origin.
    struct Bowl {
        space: SearchSpace,
    }

    impl Objective for Bowl {
        fn space(&self) -> &SearchSpace {
            &self.space
        }

        fn bound(&self) -> BoundKind {
            BoundKind::Cfim
        }

        fn evaluate(&self, x: &[f64]) -> Result<f64> {
            if x.iter().all(|v| *v == 0.0) {
                return Err(NumericalError::SingularMatrix("origin".into()).into());
            }
            if x[0].is_nan() {
                return Err(NumericalError::NonFinite("nan".into()).into());
            }
            Ok(-x.iter().map(|v| (v - 0.5) * (v - 0.5)).sum::<f64>())
        }
    }

    fn bowl() -> Bowl {
        Bowl {
            space: SearchSpace::Control {
                ctrl_num: 1,
                steps: 2,
                bound: (-1.0, 1.0),
            },
        }
    }

    #[test]
    fn test_tracks_best_and_faults() {
        let objective = bowl();
        let mut tracker = RunTracker::new("TEST", None, true);

        tracker.evaluate(&objective, &[0.1, 0.1]).unwrap();
        assert!(tracker.end_episode(tracker.best().1, &[0.1, 0.1]));

        let v = tracker.evaluate(&objective, &[0.0, 0.0]).unwrap();
        assert_eq!(v, f64::NEG_INFINITY);
        tracker.evaluate(&objective, &[0.5, 0.4]).unwrap();
        assert!(tracker.end_episode(tracker.best().1, &[0.5, 0.4]));

        let result = tracker.finish(&objective.space, 2).unwrap();
        assert_eq!(result.faulted_episodes, vec![1]);
        assert_eq!(result.best_episode, 1);
        assert_eq!(result.trace.len(), 2);
        assert_eq!(result.candidates.len(), 2);
        assert!(!result.terminated_early);
    }

    #[test]
    fn test_unrecoverable_error_aborts() {
        let objective = bowl();
        let mut tracker = RunTracker::new("TEST", None, false);
        assert!(tracker.evaluate(&objective, &[f64::NAN, 0.0]).is_err());
    }

    #[test]
    fn test_wall_clock_cutoff() {
        let objective = bowl();
        let mut tracker = RunTracker::new("TEST", Some(1e-9), false);
        tracker.evaluate(&objective, &[0.2, 0.2]).unwrap();
        std::thread::sleep(Duration::from_millis(1));
        assert!(!tracker.end_episode(0.0, &[0.2, 0.2]));
        let result = tracker.finish(&objective.space, 10).unwrap();
        assert!(result.terminated_early);
        assert_eq!(result.episodes, 1);
        assert!(result.candidates.is_empty());
    }
}
