// kalman_core/src/calibration/linear_drift.rs

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::calibration::{CalibrationRecord, MeasurementCalibration};
use crate::error::CalibrationError;
use crate::types::{Covariance, Measurement, State};

/// Parameters of the scalar drift model `h_i = h_{i-1} + drift`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LinearDriftParams {
    /// The first hidden state.
    pub start_value: f64,
    /// Added to the hidden state on every step after the first.
    pub drift: f64,
    /// Noise is drawn uniformly from `[-noise_range, noise_range]`.
    pub noise_range: f64,
}

impl Default for LinearDriftParams {
    fn default() -> Self {
        Self {
            start_value: 50.0,
            drift: 140.0,
            noise_range: 5000.0,
        }
    }
}

/// The span `2 * noise_range` of the noise distribution must stay finite.
pub const MAX_NOISE_RANGE: f64 = f64::MAX / 4.0;

impl LinearDriftParams {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !self.start_value.is_finite() {
            return Err(CalibrationError::NonFiniteParameter {
                name: "start_value",
                value: self.start_value,
            });
        }
        if !self.drift.is_finite() {
            return Err(CalibrationError::NonFiniteParameter {
                name: "drift",
                value: self.drift,
            });
        }
        if !(self.noise_range >= 0.0 && self.noise_range <= MAX_NOISE_RANGE) {
            return Err(CalibrationError::InvalidNoiseRange(self.noise_range));
        }
        Ok(())
    }
}

/// A one-dimensional generator: deterministic linear drift plus uniform noise.
///
/// The recorded measurement covariance is the square of the noise actually
/// drawn for that step, i.e. the realised variance rather than a prior.
#[derive(Debug, Clone)]
pub struct LinearDriftCalibration<R: Rng> {
    params: LinearDriftParams,
    rng: R,
    noise: Uniform<f64>,
    hidden_states: Vec<State>,
    measured_states: Vec<Measurement>,
    measurement_covariances: Vec<Covariance>,
}

impl<R: Rng> LinearDriftCalibration<R> {
    /// Creates a generator with the default parameters (start 50, drift 140, noise ±5000).
    pub fn new(rng: R) -> Self {
        Self::build(LinearDriftParams::default(), rng)
    }

    pub fn with_params(params: LinearDriftParams, rng: R) -> Result<Self, CalibrationError> {
        params.validate()?;
        Ok(Self::build(params, rng))
    }

    fn build(params: LinearDriftParams, rng: R) -> Self {
        Self {
            params,
            rng,
            noise: Uniform::new_inclusive(-params.noise_range, params.noise_range),
            hidden_states: Vec::new(),
            measured_states: Vec::new(),
            measurement_covariances: Vec::new(),
        }
    }

    pub fn params(&self) -> &LinearDriftParams {
        &self.params
    }

    /// Every generated step, in order.
    pub fn records(&self) -> impl Iterator<Item = CalibrationRecord<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.record(i))
    }

    fn next_hidden_state(&self) -> State {
        match self.hidden_states.last() {
            None => DVector::from_element(1, self.params.start_value),
            Some(previous) => previous.add_scalar(self.params.drift),
        }
    }
}

impl<R: Rng> MeasurementCalibration for LinearDriftCalibration<R> {
    fn hidden_states(&self) -> &[State] {
        &self.hidden_states
    }

    fn measured_states(&self) -> &[Measurement] {
        &self.measured_states
    }

    fn measurement_covariances(&self) -> &[Covariance] {
        &self.measurement_covariances
    }

    fn iterate(&mut self, count: usize) {
        for _ in 0..count {
            let hidden_state = self.next_hidden_state();
            let noise = self.noise.sample(&mut self.rng);
            let measured_state = hidden_state.add_scalar(noise);

            trace!(hidden = hidden_state[0], noise, "generated calibration step");

            self.hidden_states.push(hidden_state);
            self.measured_states.push(measured_state);
            self.measurement_covariances
                .push(DMatrix::from_element(1, 1, noise * noise));
        }
    }
}
