// kalman_sim/src/config/mod.rs

//! Loading scenario files from disk and applying command-line overrides.

pub mod serde_helpers;
pub mod structs;

use std::path::Path;

use figment::{
    providers::{Format, Toml},
    Figment,
};
use tracing::info;

use crate::cli::Cli;
use crate::error::SimError;

// Re-export public types
pub use structs::{
    ControlConfig, FilterConfig, RunMode, ScenarioConfig, Simulation, ValidationConfig,
};

/// Reads and deserialises a scenario TOML file.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, SimError> {
    // A missing file would otherwise extract as an empty document.
    if !path.is_file() {
        return Err(SimError::ScenarioNotFound(path.to_path_buf()));
    }
    info!("Loading scenario from: {}", path.display());

    let config = Figment::new().merge(Toml::file(path)).extract()?;
    Ok(config)
}

impl ScenarioConfig {
    /// Command-line values take precedence over the scenario file.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(seed) = cli.seed {
            self.simulation.seed = Some(seed);
        }
        if let Some(steps) = cli.steps {
            self.simulation.steps = steps;
        }
        if let Some(output) = &cli.output {
            self.simulation.output = Some(output.clone());
        }
    }
}
