// kalman_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Kalman Sim: drives a linear Kalman filter through synthetic or recorded scenarios.
///
/// This struct defines the command-line arguments accepted by the `kalman_sim`
/// binary. Anything given here overrides the matching value in the scenario file.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(
        short,
        long,
        default_value = "assets/scenarios/calibration_drift.toml"
    )]
    pub scenario: PathBuf,

    /// Seed for the measurement generator. Overrides `simulation.seed`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of calibration steps. Overrides `simulation.steps`.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Write the run report here instead of printing it.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// A `tracing` filter directive, e.g. `info,kalman_core=trace`.
    /// Falls back to `RUST_LOG`, then to the built-in default.
    #[arg(long)]
    pub log_level: Option<String>,
}
