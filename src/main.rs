// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS Metrology CLI
//!
//! Evaluates precision bounds along Lindblad trajectories and runs the
//! state, measurement and control optimizers.
//!
//! # Usage
//!
//! ```bash
//! # QFI and CFI at every time point
//! qubit-os-metrology bounds --problem problem.yaml --output bounds.json
//!
//! # Optimize control pulses with PSO
//! qubit-os-metrology optimize --problem problem.yaml --method pso --target control
//!
//! # Show effective configuration
//! qubit-os-metrology config
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ndarray::Array2;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qubit_os_metrology::bounds::{cfim, holevo_bound, qfim, Information};
use qubit_os_metrology::config::Config;
use qubit_os_metrology::dynamics::Dynamics;
use qubit_os_metrology::measurement::computational_basis;
use qubit_os_metrology::objective::BoundKind;
use qubit_os_metrology::optimize::{self, Method, RunRecord};
use qubit_os_metrology::problem::{Problem, Target};
use qubit_os_metrology::{Result, VERSION};

/// QubitOS quantum metrology toolkit
#[derive(Parser)]
#[command(name = "qubit-os-metrology")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Quantum metrology bounds and optimizers")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate QFI and CFI along a Lindblad trajectory
    Bounds {
        /// YAML problem file
        #[arg(short, long)]
        problem: PathBuf,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run an optimizer and write its run record
    Optimize {
        /// YAML problem file
        #[arg(short, long)]
        problem: PathBuf,

        /// Optimization method (ad, pso, de, nm, ddpg)
        #[arg(short, long)]
        method: Method,

        /// What to optimize (state, measurement, control)
        #[arg(short, long, default_value = "control")]
        target: Target,

        /// Seed for every optimizer
        #[arg(long, env = "QUBITOS_METROLOGY_SEED")]
        seed: Option<u64>,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;

    // Initialize logging
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, &config.logging.format);

    match cli.command {
        Commands::Bounds { problem, output } => {
            config.validate()?;
            let problem = Problem::load(&problem)?;
            let report = evaluate_bounds(&problem, &config)?;
            match output {
                Some(path) => {
                    write_json(&path, &report)?;
                    info!(path = %path.display(), points = report.times.len(), "Bounds written");
                }
                None => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }

        Commands::Optimize {
            problem,
            method,
            target,
            seed,
        } => {
            if let Some(seed) = seed {
                config.set_seed(seed);
            }
            if config.output.save_all_candidates {
                config.ad.save_all = true;
                config.pso.save_all = true;
                config.de.save_all = true;
                config.nm.save_all = true;
                config.ddpg.save_all = true;
            }
            config.validate()?;

            let problem = Problem::load(&problem)?;
            let objective = problem.objective(target, config.engine.ld_type, config.engine.accuracy)?;
            let description = format!("{} ({} optimization)", objective.bound(), target);
            let initial = problem.initial_candidates(target)?;

            let mut optimizer = optimize::build(method, objective, &config, &initial)?;
            let result = optimizer.run()?;

            let seed = method.seed(&config);
            let path = Path::new(&config.output.directory).join(format!(
                "{}_{}_seed{}.json",
                method.to_string().to_lowercase(),
                target,
                seed
            ));
            RunRecord::new(&result, description, seed, method.save_all(&config)).save_json(&path)?;

            println!(
                "{}: best {:.6e} at episode {} ({} episodes{})",
                result.method,
                result.best_value,
                result.best_episode,
                result.episodes,
                if result.terminated_early { ", stopped early" } else { "" }
            );
            println!("Run record: {}", path.display());
        }

        Commands::Config => {
            // Show effective configuration
            println!("{}", serde_yml::to_string(&config)?);
        }

        Commands::Validate => {
            // Validate configuration
            match config.validate() {
                Ok(()) => {
                    println!("Configuration is valid");
                }
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Bounds at every point of the time grid.
#[derive(Serialize)]
struct BoundsReport {
    times: Vec<f64>,
    qfim: Vec<Information>,
    cfim: Vec<Information>,
    /// Holevo bound, only when the problem asks for HCRB
    #[serde(skip_serializing_if = "Option::is_none")]
    hcrb: Option<Vec<Option<f64>>>,
}

fn evaluate_bounds(problem: &Problem, config: &Config) -> Result<BoundsReport> {
    let dynamics = problem.dynamics()?;
    let rho0 = problem.rho0()?;
    let kind = problem.bound_kind(config.engine.ld_type)?;
    let options = problem.options(config.engine.accuracy)?;
    let accuracy = options.accuracy;
    let povm = options.povm.unwrap_or_else(|| computational_basis(dynamics.dim()));
    let weight = options
        .weight
        .unwrap_or_else(|| Array2::eye(dynamics.param_num()));
    let ld = config.engine.ld_type;

    info!(
        points = dynamics.tspan().len(),
        dim = dynamics.dim(),
        params = dynamics.param_num(),
        ld = ?ld,
        "Evaluating bounds along trajectory"
    );

    let trajectory = dynamics.evolve(&rho0, None)?;
    let mut report = BoundsReport {
        times: trajectory.times.clone(),
        qfim: Vec::with_capacity(trajectory.len()),
        cfim: Vec::with_capacity(trajectory.len()),
        hcrb: (kind == BoundKind::Hcrb).then(Vec::new),
    };

    for (k, (rho, drho)) in trajectory.rho.iter().zip(&trajectory.drho).enumerate() {
        report.qfim.push(qfim(rho, drho, ld, config.engine.rep, accuracy)?);
        report.cfim.push(cfim(rho, drho, &povm, accuracy)?);
        if let Some(hcrb) = report.hcrb.as_mut() {
            match holevo_bound(rho, drho, &weight, accuracy) {
                Ok(bound) => hcrb.push(Some(bound.value)),
                Err(e) if e.is_recoverable() => {
                    warn!(point = k, error = %e, "Holevo bound unavailable");
                    hcrb.push(None);
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(report)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    Ok(())
}
