// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for the metrology engine and optimizers.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. metrology.yaml file
//! 3. Environment variables (QUBITOS_METROLOGY_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::bounds::{Basis, LdKind, DEFAULT_ACCURACY};
use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bounds engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Gradient ascent
    #[serde(default)]
    pub ad: AdConfig,

    /// Particle swarm
    #[serde(default)]
    pub pso: PsoConfig,

    /// Differential evolution
    #[serde(default)]
    pub de: DeConfig,

    /// Nelder-Mead simplex
    #[serde(default)]
    pub nm: NmConfig,

    /// Deep deterministic policy gradient
    #[serde(default)]
    pub ddpg: DdpgConfig,

    /// Run record output
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yml::from_str(&content)?;
            }
        } else {
            for path in &["metrology.yaml", "metrology.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("QUBITOS_METROLOGY_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("QUBITOS_METROLOGY_ACCURACY") {
            if let Ok(acc) = val.parse() {
                self.engine.accuracy = acc;
            }
        }
        if let Ok(val) = env::var("QUBITOS_METROLOGY_SEED") {
            if let Ok(seed) = val.parse() {
                self.set_seed(seed);
            }
        }
    }

    /// Use the same seed for every optimizer.
    pub fn set_seed(&mut self, seed: u64) {
        self.ad.seed = seed;
        self.pso.seed = seed;
        self.de.seed = seed;
        self.nm.seed = seed;
        self.ddpg.seed = seed;
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.engine.accuracy > 0.0 && self.engine.accuracy < 1.0) {
            return Err(Error::Config(format!(
                "engine.accuracy must lie in (0, 1), got {}",
                self.engine.accuracy
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(Error::Config(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }
        self.ad.validate()?;
        self.pso.validate()?;
        self.de.validate()?;
        self.nm.validate()?;
        self.ddpg.validate()?;
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Bounds engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Zeroing threshold for probabilities and eigenvalues
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,

    /// Logarithmic derivative used for the QFIM
    #[serde(default)]
    pub ld_type: LdKind,

    /// Basis of exported logarithmic derivatives
    #[serde(default)]
    pub rep: Basis,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accuracy: default_accuracy(),
            ld_type: LdKind::default(),
            rep: Basis::default(),
        }
    }
}

fn default_accuracy() -> f64 {
    DEFAULT_ACCURACY
}

fn default_seed() -> u64 {
    1234
}

fn check_positive(section: &str, field: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::Config(format!("{}.{} must be positive, got {}", section, field, value)))
    }
}

fn check_nonzero(section: &str, field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::Config(format!("{}.{} cannot be 0", section, field)));
    }
    Ok(())
}

fn check_duration(section: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) => check_positive(section, "max_duration_sec", v),
        None => Ok(()),
    }
}

/// Gradient ascent (AD) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdConfig {
    #[serde(default = "default_ad_max_episode")]
    pub max_episode: usize,

    /// Step size
    #[serde(default = "default_ad_epsilon")]
    pub epsilon: f64,

    #[serde(default = "default_beta1")]
    pub beta1: f64,

    #[serde(default = "default_beta2")]
    pub beta2: f64,

    /// Adam denominator regularizer
    #[serde(default = "default_adam_eps")]
    pub eps: f64,

    /// Use the Adam update instead of plain ascent
    #[serde(default)]
    pub adam: bool,

    /// Central-difference step of the objective gradient
    #[serde(default = "default_fd_step")]
    pub fd_step: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Wall-clock cutoff in seconds
    #[serde(default)]
    pub max_duration_sec: Option<f64>,

    /// Keep the candidate of every episode
    #[serde(default)]
    pub save_all: bool,
}

impl Default for AdConfig {
    fn default() -> Self {
        Self {
            max_episode: default_ad_max_episode(),
            epsilon: default_ad_epsilon(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_adam_eps(),
            adam: false,
            fd_step: default_fd_step(),
            seed: default_seed(),
            max_duration_sec: None,
            save_all: false,
        }
    }
}

impl AdConfig {
    pub fn validate(&self) -> Result<()> {
        check_nonzero("ad", "max_episode", self.max_episode)?;
        check_positive("ad", "epsilon", self.epsilon)?;
        check_positive("ad", "eps", self.eps)?;
        check_positive("ad", "fd_step", self.fd_step)?;
        for (field, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(Error::Config(format!("ad.{} must lie in [0, 1), got {}", field, beta)));
            }
        }
        check_duration("ad", self.max_duration_sec)
    }
}

fn default_ad_max_episode() -> usize {
    300
}

fn default_ad_epsilon() -> f64 {
    0.01
}

fn default_beta1() -> f64 {
    0.90
}

fn default_beta2() -> f64 {
    0.99
}

fn default_adam_eps() -> f64 {
    1e-8
}

fn default_fd_step() -> f64 {
    1e-6
}

/// Particle swarm (PSO) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsoConfig {
    #[serde(default = "default_population")]
    pub particle_num: usize,

    /// `[total episodes, restart period]`
    #[serde(default = "default_pso_max_episode")]
    pub max_episode: [usize; 2],

    /// Inertia
    #[serde(default = "default_one")]
    pub c0: f64,

    /// Personal-best attraction
    #[serde(default = "default_two")]
    pub c1: f64,

    /// Global-best attraction
    #[serde(default = "default_two")]
    pub c2: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub max_duration_sec: Option<f64>,

    #[serde(default)]
    pub save_all: bool,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            particle_num: default_population(),
            max_episode: default_pso_max_episode(),
            c0: 1.0,
            c1: 2.0,
            c2: 2.0,
            seed: default_seed(),
            max_duration_sec: None,
            save_all: false,
        }
    }
}

impl PsoConfig {
    pub fn validate(&self) -> Result<()> {
        check_nonzero("pso", "particle_num", self.particle_num)?;
        check_nonzero("pso", "max_episode[0]", self.max_episode[0])?;
        check_nonzero("pso", "max_episode[1]", self.max_episode[1])?;
        for (field, v) in [("c0", self.c0), ("c1", self.c1), ("c2", self.c2)] {
            if !(v >= 0.0 && v.is_finite()) {
                return Err(Error::Config(format!("pso.{} must be non-negative, got {}", field, v)));
            }
        }
        check_duration("pso", self.max_duration_sec)
    }
}

fn default_population() -> usize {
    10
}

fn default_pso_max_episode() -> [usize; 2] {
    [1000, 100]
}

fn default_one() -> f64 {
    1.0
}

fn default_two() -> f64 {
    2.0
}

/// Differential evolution (DE) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeConfig {
    #[serde(default = "default_population")]
    pub popsize: usize,

    #[serde(default = "default_max_episode")]
    pub max_episode: usize,

    /// Mutation factor
    #[serde(default = "default_one")]
    pub c: f64,

    /// Crossover probability
    #[serde(default = "default_cr")]
    pub cr: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub max_duration_sec: Option<f64>,

    #[serde(default)]
    pub save_all: bool,
}

impl Default for DeConfig {
    fn default() -> Self {
        Self {
            popsize: default_population(),
            max_episode: default_max_episode(),
            c: 1.0,
            cr: default_cr(),
            seed: default_seed(),
            max_duration_sec: None,
            save_all: false,
        }
    }
}

impl DeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.popsize < 4 {
            return Err(Error::Config(format!(
                "de.popsize must be at least 4 for difference mutation, got {}",
                self.popsize
            )));
        }
        check_nonzero("de", "max_episode", self.max_episode)?;
        check_positive("de", "c", self.c)?;
        if !(0.0..=1.0).contains(&self.cr) {
            return Err(Error::Config(format!("de.cr must lie in [0, 1], got {}", self.cr)));
        }
        check_duration("de", self.max_duration_sec)
    }
}

fn default_max_episode() -> usize {
    1000
}

fn default_cr() -> f64 {
    0.5
}

/// Nelder-Mead (NM) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmConfig {
    /// Simplex vertex count
    #[serde(default = "default_population")]
    pub state_num: usize,

    #[serde(default = "default_max_episode")]
    pub max_episode: usize,

    /// Reflection
    #[serde(default = "default_one")]
    pub ar: f64,

    /// Expansion
    #[serde(default = "default_two")]
    pub ae: f64,

    /// Contraction
    #[serde(default = "default_half")]
    pub ac: f64,

    /// Shrink
    #[serde(default = "default_half")]
    pub as0: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub max_duration_sec: Option<f64>,

    #[serde(default)]
    pub save_all: bool,
}

impl Default for NmConfig {
    fn default() -> Self {
        Self {
            state_num: default_population(),
            max_episode: default_max_episode(),
            ar: 1.0,
            ae: 2.0,
            ac: 0.5,
            as0: 0.5,
            seed: default_seed(),
            max_duration_sec: None,
            save_all: false,
        }
    }
}

impl NmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.state_num < 2 {
            return Err(Error::Config(format!(
                "nm.state_num must be at least 2, got {}",
                self.state_num
            )));
        }
        check_nonzero("nm", "max_episode", self.max_episode)?;
        check_positive("nm", "ar", self.ar)?;
        if self.ae <= self.ar {
            return Err(Error::Config(format!(
                "nm.ae ({}) must exceed nm.ar ({})",
                self.ae, self.ar
            )));
        }
        for (field, v) in [("ac", self.ac), ("as0", self.as0)] {
            if !(v > 0.0 && v < 1.0) {
                return Err(Error::Config(format!("nm.{} must lie in (0, 1), got {}", field, v)));
            }
        }
        check_duration("nm", self.max_duration_sec)
    }
}

fn default_half() -> f64 {
    0.5
}

/// DDPG configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdpgConfig {
    /// Hidden layers of the actor and critic
    #[serde(default = "default_layer_num")]
    pub layer_num: usize,

    /// Width of each hidden layer
    #[serde(default = "default_layer_dim")]
    pub layer_dim: usize,

    #[serde(default = "default_ddpg_max_episode")]
    pub max_episode: usize,

    /// Discount factor
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Soft target update rate
    #[serde(default = "default_tau")]
    pub tau: f64,

    #[serde(default = "default_actor_lr")]
    pub actor_lr: f64,

    #[serde(default = "default_critic_lr")]
    pub critic_lr: f64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Replay buffer capacity
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Exploration noise, relative to the control range
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub max_duration_sec: Option<f64>,

    #[serde(default)]
    pub save_all: bool,
}

impl Default for DdpgConfig {
    fn default() -> Self {
        Self {
            layer_num: default_layer_num(),
            layer_dim: default_layer_dim(),
            max_episode: default_ddpg_max_episode(),
            gamma: default_gamma(),
            tau: default_tau(),
            actor_lr: default_actor_lr(),
            critic_lr: default_critic_lr(),
            batch_size: default_batch_size(),
            buffer_size: default_buffer_size(),
            noise_std: default_noise_std(),
            seed: default_seed(),
            max_duration_sec: None,
            save_all: false,
        }
    }
}

impl DdpgConfig {
    pub fn validate(&self) -> Result<()> {
        check_nonzero("ddpg", "layer_num", self.layer_num)?;
        check_nonzero("ddpg", "layer_dim", self.layer_dim)?;
        check_nonzero("ddpg", "max_episode", self.max_episode)?;
        check_nonzero("ddpg", "batch_size", self.batch_size)?;
        if self.buffer_size < self.batch_size {
            return Err(Error::Config(format!(
                "ddpg.buffer_size ({}) must be at least ddpg.batch_size ({})",
                self.buffer_size, self.batch_size
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(Error::Config(format!("ddpg.gamma must lie in [0, 1], got {}", self.gamma)));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(Error::Config(format!("ddpg.tau must lie in (0, 1], got {}", self.tau)));
        }
        check_positive("ddpg", "actor_lr", self.actor_lr)?;
        check_positive("ddpg", "critic_lr", self.critic_lr)?;
        if !(self.noise_std >= 0.0 && self.noise_std.is_finite()) {
            return Err(Error::Config(format!(
                "ddpg.noise_std must be non-negative, got {}",
                self.noise_std
            )));
        }
        check_duration("ddpg", self.max_duration_sec)
    }
}

fn default_layer_num() -> usize {
    3
}

fn default_layer_dim() -> usize {
    200
}

fn default_ddpg_max_episode() -> usize {
    500
}

fn default_gamma() -> f64 {
    0.99
}

fn default_tau() -> f64 {
    0.01
}

fn default_actor_lr() -> f64 {
    1e-4
}

fn default_critic_lr() -> f64 {
    1e-3
}

fn default_batch_size() -> usize {
    64
}

fn default_buffer_size() -> usize {
    10_000
}

fn default_noise_std() -> f64 {
    0.2
}

/// Run record output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for run records
    #[serde(default = "default_output_dir")]
    pub directory: String,

    /// Retain per-episode candidates in run records
    #[serde(default)]
    pub save_all_candidates: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_all_candidates: false,
        }
    }
}

fn default_output_dir() -> String {
    "./runs".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ad.max_episode, 300);
        assert_eq!(config.pso.max_episode, [1000, 100]);
        assert_eq!(config.de.popsize, 10);
        assert_eq!(config.nm.as0, 0.5);
        assert_eq!(config.ddpg.layer_dim, 200);
        assert_eq!(config.engine.ld_type, LdKind::Sld);
        assert_eq!(config.engine.accuracy, DEFAULT_ACCURACY);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut bad_config = Config::default();
        bad_config.de.popsize = 3;
        assert!(bad_config.validate().is_err());
    }

    #[test]
    fn test_config_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
engine:
  accuracy: 1.0e-10
  ld_type: RLD
pso:
  particle_num: 4
  max_episode: [20, 5]
"#
        )
        .unwrap();

        let config = Config::load(Some(f.path())).unwrap();
        assert_eq!(config.engine.accuracy, 1e-10);
        assert_eq!(config.engine.ld_type, LdKind::Rld);
        assert_eq!(config.pso.particle_num, 4);
        assert_eq!(config.pso.max_episode, [20, 5]);
        // Untouched sections keep their defaults
        assert_eq!(config.pso.c1, 2.0);
        assert_eq!(config.nm.state_num, 10);
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let path = std::path::Path::new("/tmp/does_not_exist_qubitos_metrology_test.yaml");
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.de.max_episode, 1000);
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{{{not: valid: yaml::::").unwrap();

        let result = Config::load(Some(f.path()));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_unknown_ld_type() {
        let result: std::result::Result<Config, _> = serde_yml::from_str("engine:\n  ld_type: XLD\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        std::env::set_var("QUBITOS_METROLOGY_LOG_LEVEL", "debug");
        std::env::set_var("QUBITOS_METROLOGY_ACCURACY", "1e-6");
        std::env::set_var("QUBITOS_METROLOGY_SEED", "7");
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.engine.accuracy, 1e-6);
        assert_eq!(config.pso.seed, 7);
        assert_eq!(config.ddpg.seed, 7);
        std::env::remove_var("QUBITOS_METROLOGY_LOG_LEVEL");
        std::env::remove_var("QUBITOS_METROLOGY_ACCURACY");
        std::env::remove_var("QUBITOS_METROLOGY_SEED");
    }

    #[test]
    fn test_validate_accuracy_range() {
        let mut config = Config::default();
        config.engine.accuracy = 0.0;
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("accuracy"));
    }

    #[test]
    fn test_validate_nm_coefficients() {
        let mut config = Config::default();
        config.nm.ae = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.nm.ac = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ddpg_buffer() {
        let mut config = Config::default();
        config.ddpg.buffer_size = 10;
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("buffer_size"));
    }

    #[test]
    fn test_validate_duration() {
        let mut config = Config::default();
        config.ad.max_duration_sec = Some(-1.0);
        assert!(config.validate().is_err());
        config.ad.max_duration_sec = Some(10.0);
        assert!(config.validate().is_ok());
    }
}
