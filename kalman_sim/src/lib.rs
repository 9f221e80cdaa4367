// kalman_sim/src/lib.rs

// This module contains the command-line driver around `kalman_core`:
// scenario loading, the runners, and report output.
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod prng;
pub mod report;
pub mod runner;

use tracing::info;

use crate::cli::Cli;
use crate::config::load_scenario;
use crate::error::SimError;

/// Loads the scenario named on the command line, runs it, and emits the report.
pub fn run_from_cli(cli: &Cli) -> Result<(), SimError> {
    let mut config = load_scenario(&cli.scenario)?;
    config.apply_overrides(cli);
    info!(
        mode = ?config.simulation.mode,
        seed = ?config.simulation.seed,
        steps = config.simulation.steps,
        "Scenario loaded"
    );

    let report = runner::run(&config)?;
    match &config.simulation.output {
        Some(path) => report.write_to(path)?,
        None => println!("{}", report.to_toml()?),
    }
    Ok(())
}
