// kalman_core/src/calibration/mod.rs

//! Synthetic measurement generators. Each one produces index-aligned sequences
//! of ground truth, noisy measurements, and measurement covariances that can be
//! fed straight into a `KalmanFilterProcess`.

use crate::types::{Covariance, Measurement, State};

pub mod linear_drift;

/// One index of a generator's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationRecord<'a> {
    pub hidden_state: &'a State,
    pub measured_state: &'a Measurement,
    pub measurement_covariance: &'a Covariance,
}

// --- MEASUREMENT GENERATOR TRAIT ---
pub trait MeasurementCalibration {
    /// The noiseless ground truth, one entry per generated step.
    fn hidden_states(&self) -> &[State];

    /// The ground truth with noise applied.
    fn measured_states(&self) -> &[Measurement];

    /// The covariance to hand to the filter alongside each measurement.
    fn measurement_covariances(&self) -> &[Covariance];

    /// Appends `count` new steps. Generators are not restartable.
    fn iterate(&mut self, count: usize);

    fn len(&self) -> usize {
        self.hidden_states().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the step at `index`, if it has been generated.
    fn record(&self, index: usize) -> Option<CalibrationRecord<'_>> {
        Some(CalibrationRecord {
            hidden_state: self.hidden_states().get(index)?,
            measured_state: self.measured_states().get(index)?,
            measurement_covariance: self.measurement_covariances().get(index)?,
        })
    }
}
