// kalman_core/src/validation/mod.rs

//! Cross-validation against an independent reference filter.
//!
//! The reference filter carries the limitations of a classic predict/correct
//! implementation: the measurement covariance is fixed for a whole run and
//! there must be exactly one control vector per measurement. `ReferenceDataSet`
//! enforces both before anything is computed.

use thiserror::Error;
use tracing::debug;

use crate::error::FilterError;
use crate::types::{Control, Covariance, Measurement, State};

pub mod reference;

pub use reference::{MeasurementModel, ProcessModel, ReferenceKalmanFilter};

/// Contract violations of the reference run, plus any filter failure inside it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("expected one control vector per measurement, got {measurements} measurements and {controls} controls")]
    LengthMismatch { measurements: usize, controls: usize },
    #[error("measurement covariance at step {index} differs from step 0; the reference filter needs one covariance per run")]
    VaryingMeasurementCovariance { index: usize },
    #[error("no measurement covariance supplied")]
    EmptyCovarianceSequence,
    #[error(transparent)]
    Filter(#[from] FilterError),
}

// --- REFERENCE FILTER TRAIT ---
// A predict/correct cycle whose estimate can be read back after each step.
pub trait ReferenceFilter {
    /// Extrapolates the estimate, applying `control` through the filter's own `B`.
    fn predict(&mut self, control: Option<&Control>) -> Result<(), FilterError>;

    /// Fuses a measurement using the filter's fixed `H` and `R`.
    fn correct(&mut self, z: &Measurement) -> Result<(), FilterError>;

    /// A snapshot of the current state estimate.
    fn state_estimation(&self) -> State;

    /// A snapshot of the current error covariance.
    fn error_covariance(&self) -> Covariance;
}

/// Runs a reference filter over paired measurement/control sequences and keeps
/// a snapshot of the estimate after every cycle.
#[derive(Debug, Clone)]
pub struct ReferenceDataSet<F: ReferenceFilter = ReferenceKalmanFilter> {
    filter: F,
    measurements: Vec<Measurement>,
    controls: Vec<Control>,
    state_estimations: Vec<State>,
    error_covariances: Vec<Covariance>,
}

impl ReferenceDataSet<ReferenceKalmanFilter> {
    /// Builds a [`ReferenceKalmanFilter`] from the models and pairs it with the sequences.
    pub fn new(
        process: ProcessModel,
        measurement: MeasurementModel,
        measurements: Vec<Measurement>,
        controls: Vec<Control>,
    ) -> Result<Self, ValidationError> {
        check_lengths(&measurements, &controls)?;
        let filter = ReferenceKalmanFilter::new(process, measurement)?;
        Self::with_filter(filter, measurements, controls)
    }
}

impl<F: ReferenceFilter> ReferenceDataSet<F> {
    pub fn with_filter(
        filter: F,
        measurements: Vec<Measurement>,
        controls: Vec<Control>,
    ) -> Result<Self, ValidationError> {
        check_lengths(&measurements, &controls)?;
        Ok(Self {
            filter,
            measurements,
            controls,
            state_estimations: Vec::new(),
            error_covariances: Vec::new(),
        })
    }

    /// Runs one `predict(u_i)` then `correct(z_i)` per pair, in order.
    ///
    /// Snapshots from earlier calls are kept; calling this twice continues the
    /// filter from where it stopped.
    pub fn generate(&mut self) -> Result<(), ValidationError> {
        for (step, (z, u)) in self.measurements.iter().zip(&self.controls).enumerate() {
            self.filter.predict(Some(u))?;
            self.filter.correct(z)?;
            self.state_estimations.push(self.filter.state_estimation());
            self.error_covariances.push(self.filter.error_covariance());
            debug!(step, "reference cycle complete");
        }
        Ok(())
    }

    pub fn state_estimations(&self) -> &[State] {
        &self.state_estimations
    }

    pub fn error_covariances(&self) -> &[Covariance] {
        &self.error_covariances
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }
}

fn check_lengths(measurements: &[Measurement], controls: &[Control]) -> Result<(), ValidationError> {
    if measurements.len() == controls.len() {
        Ok(())
    } else {
        Err(ValidationError::LengthMismatch {
            measurements: measurements.len(),
            controls: controls.len(),
        })
    }
}

/// Collapses a per-step covariance sequence to the single covariance the
/// reference filter accepts, failing if any step differs from the first.
pub fn uniform_covariance(covariances: &[Covariance]) -> Result<&Covariance, ValidationError> {
    let (first, rest) = covariances
        .split_first()
        .ok_or(ValidationError::EmptyCovarianceSequence)?;
    match rest.iter().position(|c| c != first) {
        Some(offset) => Err(ValidationError::VaryingMeasurementCovariance { index: offset + 1 }),
        None => Ok(first),
    }
}

/// The largest absolute element-wise difference between two estimate
/// sequences. Sequences of different length or shape diverge infinitely.
pub fn max_divergence(
    states_a: &[State],
    covariances_a: &[Covariance],
    states_b: &[State],
    covariances_b: &[Covariance],
) -> f64 {
    if states_a.len() != states_b.len() || covariances_a.len() != covariances_b.len() {
        return f64::INFINITY;
    }

    let state_gap = states_a.iter().zip(states_b).map(|(a, b)| {
        if a.shape() != b.shape() {
            return f64::INFINITY;
        }
        (a - b).amax()
    });
    let covariance_gap = covariances_a.iter().zip(covariances_b).map(|(a, b)| {
        if a.shape() != b.shape() {
            return f64::INFINITY;
        }
        (a - b).amax()
    });

    state_gap.chain(covariance_gap).fold(0.0, f64::max)
}
