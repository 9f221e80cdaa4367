// kalman_sim/src/error.rs

use std::path::PathBuf;

use kalman_core::prelude::{CalibrationError, FilterError, ValidationError};
use thiserror::Error;

/// Everything that can end a simulation run early.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("scenario file not found: {}", .0.display())]
    ScenarioNotFound(PathBuf),

    #[error("failed to load or parse scenario: {0}")]
    Config(#[from] figment::Error),

    #[error("scenario selects mode `{mode}` but has no [{section}] section")]
    MissingSection {
        mode: &'static str,
        section: &'static str,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("filter process diverged from the reference by {divergence:e} (tolerance {tolerance:e})")]
    Divergence { divergence: f64, tolerance: f64 },

    #[error("failed to serialise run report: {0}")]
    Report(#[from] toml::ser::Error),

    #[error("failed to write run report to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
