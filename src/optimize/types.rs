// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Search spaces, candidates and run results shared by all optimizers.

use std::path::Path;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Serialize;

use crate::error::{NumericalError, Result, ValidationError};
use crate::measurement::{MeasurementCandidate, MeasurementParam};

/// The structural constraint set an optimizer searches over.
///
/// Every optimizer works on flat real vectors; the space maps those to
/// physical candidates and back.
#[derive(Debug, Clone)]
pub enum SearchSpace {
    /// Normalized probe state `|ψ⟩` of dimension `dim` (`2·dim` reals).
    State { dim: usize },
    /// POVM in the given parameterization.
    Measurement { param: MeasurementParam, dim: usize },
    /// Piecewise-constant pulses, `ctrl_num × steps`, clamped to `bound`.
    Control {
        ctrl_num: usize,
        steps: usize,
        bound: (f64, f64),
    },
}

/// A physical candidate: the decoded form of a search-space point.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "target", content = "value", rename_all = "snake_case")]
pub enum Candidate {
    State(Array1<Complex64>),
    Measurement(MeasurementCandidate),
    Control(Array2<f64>),
}

impl SearchSpace {
    pub fn name(&self) -> &'static str {
        match self {
            SearchSpace::State { .. } => "state",
            SearchSpace::Measurement { .. } => "measurement",
            SearchSpace::Control { .. } => "control",
        }
    }

    /// Length of the real parameter vector.
    pub fn dimension(&self) -> usize {
        match self {
            SearchSpace::State { dim } => 2 * dim,
            SearchSpace::Measurement { param, dim } => param.dimension(*dim),
            SearchSpace::Control { ctrl_num, steps, .. } => ctrl_num * steps,
        }
    }

    /// Draw a random feasible point.
    pub fn random(&self, rng: &mut StdRng) -> Vec<f64> {
        match self {
            SearchSpace::State { .. } => {
                let mut x: Vec<f64> = (0..self.dimension()).map(|_| rng.sample(StandardNormal)).collect();
                self.project(&mut x);
                x
            }
            SearchSpace::Measurement { param, dim } => param.random(*dim, rng),
            SearchSpace::Control { bound, .. } => {
                let (lo, hi) = sampling_interval(*bound);
                (0..self.dimension())
                    .map(|_| if hi > lo { rng.gen_range(lo..hi) } else { lo })
                    .collect()
            }
        }
    }

    /// Map a point back onto the feasible set in place.
    pub fn project(&self, x: &mut [f64]) {
        match self {
            SearchSpace::State { .. } => {
                let n = x.iter().map(|v| v * v).sum::<f64>().sqrt();
                if n > 0.0 && n.is_finite() {
                    x.iter_mut().for_each(|v| *v /= n);
                }
            }
            SearchSpace::Measurement { param, .. } => param.project(x),
            SearchSpace::Control { bound, .. } => {
                for v in x.iter_mut() {
                    *v = v.clamp(bound.0, bound.1);
                }
            }
        }
    }

    /// Decode a point into its physical candidate.
    ///
    /// # Errors
    /// Wrong length is a validation error; a zero-norm state or dependent
    /// projective vectors are recoverable `SingularMatrix` faults.
    pub fn decode(&self, x: &[f64]) -> Result<Candidate> {
        self.check_len(x.len())?;
        match self {
            SearchSpace::State { dim } => {
                let psi: Array1<Complex64> =
                    (0..*dim).map(|k| Complex64::new(x[2 * k], x[2 * k + 1])).collect();
                let n = psi.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
                if !(n > 1e-12) {
                    return Err(
                        NumericalError::SingularMatrix("probe state has zero norm".into()).into()
                    );
                }
                Ok(Candidate::State(psi.mapv(|z| z / n)))
            }
            SearchSpace::Measurement { param, dim } => {
                Ok(Candidate::Measurement(param.decode(x, *dim)?))
            }
            SearchSpace::Control { ctrl_num, steps, .. } => {
                let pulses = Array2::from_shape_vec((*ctrl_num, *steps), x.to_vec()).map_err(|e| {
                    ValidationError::Field {
                        field: "pulses".into(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Candidate::Control(pulses))
            }
        }
    }

    /// Flatten a candidate back into a point of this space.
    pub fn encode(&self, candidate: &Candidate) -> Result<Vec<f64>> {
        let x = match (self, candidate) {
            (SearchSpace::State { .. }, Candidate::State(psi)) => {
                psi.iter().flat_map(|z| [z.re, z.im]).collect()
            }
            (SearchSpace::Measurement { .. }, Candidate::Measurement(m)) => m.params.clone(),
            (SearchSpace::Control { ctrl_num, steps, .. }, Candidate::Control(pulses)) => {
                if pulses.dim() != (*ctrl_num, *steps) {
                    return Err(ValidationError::DimensionMismatch {
                        what: "control pulses".into(),
                        expected: format!("{} × {}", ctrl_num, steps),
                        actual: format!("{} × {}", pulses.nrows(), pulses.ncols()),
                    }
                    .into());
                }
                pulses.iter().copied().collect()
            }
            _ => {
                return Err(ValidationError::Field {
                    field: "initial candidate".into(),
                    message: format!("does not belong to the {} search space", self.name()),
                }
                .into())
            }
        };
        self.check_len(x.len())?;
        Ok(x)
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.dimension() {
            return Err(ValidationError::DimensionMismatch {
                what: format!("{} parameters", self.name()),
                expected: self.dimension().to_string(),
                actual: len.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Interval used for random control amplitudes: the bound intersected
/// with `[-1, 1]`, or a unit-width slice at the finite edge when the
/// bound lies outside it.
pub(crate) fn sampling_interval(bound: (f64, f64)) -> (f64, f64) {
    let (lo, hi) = bound;
    if lo >= 1.0 {
        (lo, hi.min(lo + 1.0))
    } else if hi <= -1.0 {
        (lo.max(hi - 1.0), hi)
    } else {
        (lo.max(-1.0), hi.min(1.0))
    }
}

/// Outcome of an optimization run.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub method: String,
    pub best: Candidate,
    pub best_value: f64,
    /// Episode in which `best` was found.
    pub best_episode: usize,
    /// One objective value per completed episode.
    pub trace: Vec<f64>,
    /// Episodes in which some candidate hit a recoverable numerical fault.
    pub faulted_episodes: Vec<usize>,
    pub episodes: usize,
    /// Stopped by the wall-clock cutoff.
    pub terminated_early: bool,
    /// Per-episode candidates, when requested.
    pub candidates: Vec<Candidate>,
}

/// Common interface of all optimization methods.
pub trait Optimizer {
    /// Method name (AD, PSO, DE, NM, DDPG).
    fn name(&self) -> &'static str;

    /// Execute the run to completion.
    fn run(&mut self) -> Result<OptimizationResult>;
}

/// Persisted record of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord<'a> {
    pub version: &'static str,
    pub method: &'a str,
    pub objective: String,
    pub seed: u64,
    pub best: &'a Candidate,
    pub best_value: f64,
    pub best_episode: usize,
    pub trace: &'a [f64],
    pub faulted_episodes: &'a [usize],
    pub terminated_early: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<&'a [Candidate]>,
}

impl<'a> RunRecord<'a> {
    pub fn new(result: &'a OptimizationResult, objective: String, seed: u64, save_all: bool) -> Self {
        Self {
            version: crate::VERSION,
            method: &result.method,
            objective,
            seed,
            best: &result.best,
            best_value: result.best_value,
            best_episode: result.best_episode,
            trace: &result.trace,
            faulted_episodes: &result.faulted_episodes,
            terminated_early: result.terminated_early,
            candidates: save_all.then_some(result.candidates.as_slice()),
        }
    }

    /// Write the record as pretty-printed JSON, creating parent directories.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    #[test]
    fn test_state_space_random_is_normalized() {
        let space = SearchSpace::State { dim: 3 };
        let mut rng = StdRng::seed_from_u64(5);
        let x = space.random(&mut rng);
        assert_eq!(x.len(), 6);
        match space.decode(&x).unwrap() {
            Candidate::State(psi) => {
                let n: f64 = psi.iter().map(|z| z.norm_sqr()).sum();
                assert_relative_eq!(n, 1.0, epsilon = 1e-12);
            }
            _ => panic!("expected a state"),
        }
    }

    #[test]
    fn test_state_zero_norm_is_recoverable() {
        let space = SearchSpace::State { dim: 2 };
        let err = space.decode(&[0.0; 4]).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_encode_decode_state() {
        let space = SearchSpace::State { dim: 2 };
        let x = vec![0.6, 0.0, 0.0, 0.8];
        let cand = space.decode(&x).unwrap();
        let back = space.encode(&cand).unwrap();
        for (a, b) in x.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_control_project_clamps() {
        let space = SearchSpace::Control {
            ctrl_num: 2,
            steps: 2,
            bound: (-0.5, 0.5),
        };
        let mut x = vec![-2.0, 0.1, 0.7, 0.5];
        space.project(&mut x);
        assert_eq!(x, vec![-0.5, 0.1, 0.5, 0.5]);
        match space.decode(&x).unwrap() {
            Candidate::Control(p) => assert_eq!(p[[1, 0]], 0.5),
            _ => panic!("expected pulses"),
        }
    }

    #[test]
    fn test_control_random_respects_bound() {
        let mut rng = StdRng::seed_from_u64(9);
        let unbounded = SearchSpace::Control {
            ctrl_num: 1,
            steps: 50,
            bound: (f64::NEG_INFINITY, f64::INFINITY),
        };
        assert!(unbounded.random(&mut rng).iter().all(|v| (-1.0..=1.0).contains(v)));

        let shifted = SearchSpace::Control {
            ctrl_num: 1,
            steps: 50,
            bound: (2.0, 5.0),
        };
        assert!(shifted.random(&mut rng).iter().all(|v| (2.0..=3.0).contains(v)));
    }

    #[test]
    fn test_encode_rejects_foreign_candidate() {
        let space = SearchSpace::State { dim: 2 };
        let cand = Candidate::Control(Array2::zeros((1, 3)));
        assert!(space.encode(&cand).is_err());

        let control = SearchSpace::Control {
            ctrl_num: 1,
            steps: 2,
            bound: (-1.0, 1.0),
        };
        assert!(control.encode(&cand).is_err());
    }

    #[test]
    fn test_run_record_json() {
        let result = OptimizationResult {
            method: "PSO".into(),
            best: Candidate::Control(Array2::from_elem((1, 2), 0.25)),
            best_value: 3.5,
            best_episode: 1,
            trace: vec![1.0, 3.5],
            faulted_episodes: vec![0],
            episodes: 2,
            terminated_early: false,
            candidates: vec![],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.json");
        RunRecord::new(&result, "QFIM".into(), 1234, false)
            .save_json(&path)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["method"], "PSO");
        assert_eq!(value["best"]["target"], "control");
        assert_eq!(value["trace"][1], 3.5);
        assert_eq!(value["faulted_episodes"][0], 0);
        assert!(value.get("candidates").is_none());
    }
}
