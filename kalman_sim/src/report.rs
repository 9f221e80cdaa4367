// kalman_sim/src/report.rs

use std::fs;
use std::path::Path;

use kalman_core::prelude::{Covariance, Matrix, State};
use serde::Serialize;
use tracing::info;

use crate::config::serde_helpers;
use crate::config::RunMode;
use crate::error::SimError;

/// Everything a run produced, in a form that round-trips through TOML.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub summary: Summary,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub steps: usize,
    /// Updates skipped because the innovation covariance was singular.
    pub skipped_updates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_rms_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_rms_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_divergence: Option<f64>,
}

/// The estimate after one predict/update cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measured: Option<f64>,
    pub updated: bool,
    #[serde(with = "serde_helpers::dvector")]
    pub state: State,
    #[serde(with = "serde_helpers::dmatrix_rows")]
    pub covariance: Covariance,
    /// Only present when the process records debug snapshots.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_dmatrix_rows"
    )]
    pub gain: Option<Matrix>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "serde_helpers::option_dvector"
    )]
    pub reference_state: Option<State>,
}

impl RunReport {
    pub fn to_toml(&self) -> Result<String, SimError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the report, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<(), SimError> {
        let contents = self.to_toml()?;
        let io_err = |source| SimError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, contents).map_err(io_err)?;
        info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector};

    fn report() -> RunReport {
        RunReport {
            mode: RunMode::Calibration,
            seed: Some(3),
            summary: Summary {
                steps: 1,
                estimate_rms_error: Some(0.5),
                ..Summary::default()
            },
            steps: vec![StepReport {
                index: 0,
                truth: Some(50.0),
                measured: Some(49.5),
                updated: true,
                state: DVector::from_vec(vec![49.75]),
                covariance: DMatrix::from_element(1, 1, 0.25),
                gain: None,
                reference_state: None,
            }],
        }
    }

    #[test]
    fn test_report_serialises_to_toml() {
        let text = report().to_toml().unwrap();

        assert!(text.contains("mode = \"calibration\""));
        assert!(text.contains("seed = 3"));
        assert!(text.contains("[[steps]]"));
        assert!(text.contains("estimate_rms_error = 0.5"));
        // Absent optionals are omitted rather than written as empty values.
        assert!(!text.contains("max_divergence"));
        assert!(!text.contains("reference_state"));

        let parsed: toml::Value = toml::from_str(&text).unwrap();
        let covariance = &parsed["steps"][0]["covariance"];
        assert_eq!(covariance[0][0].as_float(), Some(0.25));
    }

    #[test]
    fn test_write_to_creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!("kalman_sim_report_{}", std::process::id()));
        let path = dir.join("nested").join("report.toml");

        report().write_to(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, report().to_toml().unwrap());

        fs::remove_dir_all(&dir).unwrap();
    }
}
