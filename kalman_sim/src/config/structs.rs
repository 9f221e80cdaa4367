// kalman_sim/src/config/structs.rs

use std::path::PathBuf;

use kalman_core::prelude::{
    Control, Covariance, FilterError, KalmanFilterProcess, LinearDriftParams, Matrix,
    Measurement, ProcessConfig, State,
};
use serde::{Deserialize, Serialize};

use crate::config::serde_helpers;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # ScenarioConfig
/// The root of the data parsed from a `scenario.toml` file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: Simulation,

    pub filter: FilterConfig,

    /// Parameters for the linear drift generator. Defaults apply when absent.
    #[serde(default)]
    pub calibration: Option<LinearDriftParams>,

    /// Required for `mode = "validation"`.
    #[serde(default)]
    pub validation: Option<ValidationConfig>,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

/// Which runner the scenario drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Generator -> filter process, compared against the hidden truth.
    #[default]
    Calibration,
    /// Filter process and reference filter over the same sequence.
    Validation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    #[serde(default)]
    pub mode: RunMode,
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Number of generator steps in a calibration run.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Where to write the run report. Printed to stdout when unset.
    pub output: Option<PathBuf>,
}

fn default_steps() -> usize {
    30
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            seed: None,
            steps: default_steps(),
            output: None,
        }
    }
}

/// A constant control input applied on every predict.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlConfig {
    #[serde(with = "serde_helpers::dmatrix_rows")]
    pub matrix: Matrix,
    #[serde(with = "serde_helpers::dvector")]
    pub vector: Control,
}

/// Initial estimate, model and default policy of the filter process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub process: ProcessConfig,

    #[serde(with = "serde_helpers::dvector")]
    pub initial_state: State,
    #[serde(with = "serde_helpers::dmatrix_rows")]
    pub initial_covariance: Covariance,
    #[serde(with = "serde_helpers::dmatrix_rows")]
    pub transition: Matrix,
    #[serde(with = "serde_helpers::dmatrix_rows")]
    pub process_noise: Covariance,

    #[serde(default)]
    pub control: Option<ControlConfig>,

    /// `H`. When absent the process falls back to its measurement policy.
    #[serde(default, with = "serde_helpers::option_dmatrix_rows")]
    pub measurement_matrix: Option<Matrix>,
}

impl FilterConfig {
    pub fn build_process(&self) -> Result<KalmanFilterProcess, FilterError> {
        KalmanFilterProcess::new(
            self.process,
            self.initial_state.clone(),
            self.initial_covariance.clone(),
            self.transition.clone(),
            self.process_noise.clone(),
        )
    }

    pub fn control(&self) -> Option<(&Matrix, &Control)> {
        self.control.as_ref().map(|c| (&c.matrix, &c.vector))
    }
}

/// A fixed measurement/control sequence replayed through both filters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    #[serde(with = "serde_helpers::dmatrix_rows")]
    pub measurement_matrix: Matrix,
    #[serde(with = "serde_helpers::dmatrix_rows")]
    pub measurement_covariance: Covariance,
    #[serde(with = "serde_helpers::dmatrix_rows")]
    pub control_matrix: Matrix,
    #[serde(deserialize_with = "serde_helpers::dvector_list::deserialize")]
    pub measurements: Vec<Measurement>,
    #[serde(deserialize_with = "serde_helpers::dvector_list::deserialize")]
    pub controls: Vec<Control>,
}
