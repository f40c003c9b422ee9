// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Deep deterministic policy gradient over control pulses.
//!
//! The environment is the stepwise controlled evolution: the observation
//! is the current density matrix, the action is one column of control
//! amplitudes and the reward is the increase of the figure of merit over
//! that step. Each episode rolls out a full pulse sequence, which is
//! offered to the run tracker as a candidate.
//!
//! Ref: Lillicrap et al. (2016), arXiv:1509.02971.

use std::collections::VecDeque;

use ndarray::{concatenate, Array1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{debug, info};

use super::alternatives;
use super::network::{Activation, Mlp, MlpAdam};
use super::tracker::RunTracker;
use super::types::{sampling_interval, OptimizationResult, Optimizer};
use crate::config::DdpgConfig;
use crate::error::{Error, Result};
use crate::objective::{Objective, SequentialEnvironment};

struct Transition {
    obs: Array1<f64>,
    /// Normalized action in `[-1, 1]`.
    action: Array1<f64>,
    reward: f64,
    next_obs: Array1<f64>,
    done: bool,
}

struct Agent {
    actor: Mlp,
    critic: Mlp,
    target_actor: Mlp,
    target_critic: Mlp,
    actor_opt: MlpAdam,
    critic_opt: MlpAdam,
    obs_dim: usize,
}

impl Agent {
    fn new(obs_dim: usize, act_dim: usize, cfg: &DdpgConfig, rng: &mut StdRng) -> Self {
        let actor = Mlp::new(obs_dim, cfg.layer_dim, cfg.layer_num, act_dim, Activation::Tanh, rng);
        let critic = Mlp::new(
            obs_dim + act_dim,
            cfg.layer_dim,
            cfg.layer_num,
            1,
            Activation::Linear,
            rng,
        );
        Self {
            actor_opt: MlpAdam::new(&actor, cfg.actor_lr),
            critic_opt: MlpAdam::new(&critic, cfg.critic_lr),
            target_actor: actor.clone(),
            target_critic: critic.clone(),
            actor,
            critic,
            obs_dim,
        }
    }

    fn q_input(obs: &Array1<f64>, action: &Array1<f64>) -> Array1<f64> {
        concatenate(Axis(0), &[obs.view(), action.view()]).unwrap_or_else(|_| obs.clone())
    }

    fn train(&mut self, batch: &[&Transition], gamma: f64, tau: f64) {
        let scale = 1.0 / batch.len() as f64;

        // Critic: minimize (Q(s, a) − y)², y = r + γ Q'(s', μ'(s'))
        let mut critic_grads = self.critic.zero_grad();
        for t in batch {
            let next_action = self.target_actor.predict(&t.next_obs);
            let next_q = self.target_critic.predict(&Self::q_input(&t.next_obs, &next_action))[0];
            let y = t.reward + if t.done { 0.0 } else { gamma * next_q };
            let fwd = self.critic.forward(&Self::q_input(&t.obs, &t.action));
            let d = Array1::from(vec![2.0 * (fwd.output[0] - y)]);
            self.critic.backward(&fwd, &d, Some(&mut critic_grads));
        }
        critic_grads.scale(scale);
        self.critic_opt.step(&mut self.critic, &critic_grads);

        // Actor: maximize Q(s, μ(s))
        let mut actor_grads = self.actor.zero_grad();
        let ascend = Array1::from(vec![1.0]);
        for t in batch {
            let actor_fwd = self.actor.forward(&t.obs);
            let critic_fwd = self.critic.forward(&Self::q_input(&t.obs, &actor_fwd.output));
            let dq_dinput = self.critic.backward(&critic_fwd, &ascend, None);
            let dq_daction = dq_dinput.slice(ndarray::s![self.obs_dim..]).mapv(|v| -v);
            self.actor.backward(&actor_fwd, &dq_daction, Some(&mut actor_grads));
        }
        actor_grads.scale(scale);
        self.actor_opt.step(&mut self.actor, &actor_grads);

        self.target_actor.soft_update(&self.actor, tau);
        self.target_critic.soft_update(&self.critic, tau);
    }
}

pub struct Ddpg {
    objective: Box<dyn Objective>,
    config: DdpgConfig,
    rng: StdRng,
}

impl Ddpg {
    pub fn new(objective: Box<dyn Objective>, config: DdpgConfig) -> Result<Self> {
        config.validate()?;
        if objective.sequential().is_none() {
            return Err(Error::UnsupportedMethod {
                method: "DDPG".into(),
                objective: format!("{} ({} optimization)", objective.bound(), objective.space().name()),
                alternatives: alternatives(objective.as_ref(), "DDPG"),
            });
        }
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            objective,
            config,
            rng,
        })
    }
}

/// Value of an intermediate state; a singular bound means no information yet.
fn reward_value(env: &dyn SequentialEnvironment, state: &crate::dynamics::DynamicsState) -> Result<f64> {
    match env.value(state) {
        Ok(v) => Ok(v),
        Err(e) if e.is_recoverable() => Ok(0.0),
        Err(e) => Err(e),
    }
}

impl Optimizer for Ddpg {
    fn name(&self) -> &'static str {
        "DDPG"
    }

    fn run(&mut self) -> Result<OptimizationResult> {
        let objective = self.objective.as_ref();
        let space = objective.space();
        let cfg = &self.config;
        let rng = &mut self.rng;
        let Some(env) = objective.sequential() else {
            return Err(Error::Config("DDPG requires a sequential control objective".into()));
        };

        let steps = env.steps();
        let ctrl_num = env.ctrl_num();
        let bound = env.control_bound();
        let (lo, hi) = sampling_interval(bound);
        let (mid, half) = ((hi + lo) / 2.0, (hi - lo) / 2.0);
        let noise = Normal::new(0.0, cfg.noise_std)
            .map_err(|e| Error::Config(format!("ddpg.noise_std: {}", e)))?;

        let mut agent = Agent::new(env.observation_dim(), ctrl_num, cfg, rng);
        let mut buffer: VecDeque<Transition> = VecDeque::with_capacity(cfg.buffer_size);

        info!(
            method = "DDPG",
            objective = %objective.bound(),
            steps,
            ctrl_num,
            episodes = cfg.max_episode,
            "Starting optimization"
        );

        let mut tracker = RunTracker::new("DDPG", cfg.max_duration_sec, cfg.save_all);

        for episode in 0..cfg.max_episode {
            let mut state = env.reset();
            let mut previous = reward_value(env, &state)?;
            // ctrl_num × steps, row-major
            let mut pulses = vec![0.0; ctrl_num * steps];
            let mut episode_reward = 0.0;

            for k in 0..steps {
                let obs = Array1::from(env.observe(&state, k));
                let action = agent
                    .actor
                    .predict(&obs)
                    .mapv(|a| (a + noise.sample(rng)).clamp(-1.0, 1.0));
                let controls: Vec<f64> = action
                    .iter()
                    .map(|a| (mid + half * a).clamp(bound.0, bound.1))
                    .collect();
                for (j, u) in controls.iter().enumerate() {
                    pulses[j * steps + k] = *u;
                }

                let next = env.advance(&state, k, &controls)?;
                let current = reward_value(env, &next)?;
                let reward = current - previous;
                previous = current;
                episode_reward += reward;

                let done = k + 1 == steps;
                let next_obs = Array1::from(env.observe(&next, k + 1));
                if buffer.len() == cfg.buffer_size {
                    buffer.pop_front();
                }
                buffer.push_back(Transition {
                    obs,
                    action,
                    reward,
                    next_obs,
                    done,
                });

                if buffer.len() >= cfg.batch_size {
                    let batch: Vec<&Transition> = (0..cfg.batch_size)
                        .map(|_| &buffer[rng.gen_range(0..buffer.len())])
                        .collect();
                    agent.train(&batch, cfg.gamma, cfg.tau);
                }
                state = next;
            }

            let value = tracker
                .guard(env.value(&state))?
                .unwrap_or(f64::NEG_INFINITY);
            tracker.offer(&pulses, value);
            debug!(episode, value, episode_reward, "DDPG episode rolled out");
            if !tracker.end_episode(value, &pulses) {
                break;
            }
        }

        tracker.finish(space, cfg.max_episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::tests::{control_objective, state_objective};
    use crate::optimize::Candidate;

    fn small_config() -> DdpgConfig {
        DdpgConfig {
            layer_num: 2,
            layer_dim: 8,
            max_episode: 6,
            batch_size: 4,
            buffer_size: 32,
            ..Default::default()
        }
    }

    #[test]
    fn test_ddpg_rejects_state_objective() {
        let err = Ddpg::new(state_objective(), small_config()).err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("DDPG is not available"));
        assert!(msg.contains("state optimization"));
        assert!(msg.contains("AD, PSO, DE, NM"));
    }

    #[test]
    fn test_ddpg_rolls_out_control_sequences() {
        let mut ddpg = Ddpg::new(control_objective(), small_config()).unwrap();
        let result = ddpg.run().unwrap();
        assert_eq!(result.method, "DDPG");
        assert_eq!(result.trace.len(), 6);
        assert!(result.best_value.is_finite());
        assert!(result.trace.iter().all(|v| *v <= result.best_value));
        match result.best {
            Candidate::Control(p) => {
                assert_eq!(p.dim(), (1, 6));
                assert!(p.iter().all(|u| (-1.0..=1.0).contains(u)));
            }
            _ => panic!("expected pulses"),
        }
    }

    #[test]
    fn test_ddpg_is_reproducible() {
        let a = Ddpg::new(control_objective(), small_config()).unwrap().run().unwrap();
        let b = Ddpg::new(control_objective(), small_config()).unwrap().run().unwrap();
        assert_eq!(a.trace, b.trace);
    }
}
