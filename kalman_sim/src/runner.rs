// kalman_sim/src/runner.rs

//! The two scenario runners. Each drives a
//! [`KalmanFilterProcess`](kalman_core::prelude::KalmanFilterProcess) built from
//! the `[filter]` section and returns a [`RunReport`].

use kalman_core::prelude::{
    FilterError, LinearDriftCalibration, Matrix, MeasurementCalibration,
    MeasurementModel, ProcessModel, ReferenceDataSet, State,
};
use kalman_core::validation::max_divergence;
use tracing::{debug, info, warn};

use crate::config::{RunMode, ScenarioConfig};
use crate::error::SimError;
use crate::prng::SimulationRng;
use crate::report::{RunReport, StepReport, Summary};

/// The largest element-wise gap tolerated between the process and the reference filter.
pub const DIVERGENCE_TOLERANCE: f64 = 1e-9;

/// Dispatches on `simulation.mode`.
pub fn run(config: &ScenarioConfig) -> Result<RunReport, SimError> {
    match config.simulation.mode {
        RunMode::Calibration => {
            let rng = SimulationRng::new(config.simulation.seed);
            run_calibration(config, rng)
        }
        RunMode::Validation => run_validation(config),
    }
}

/// Feeds a synthetic linear-drift sequence through the filter process and
/// measures how far the estimate lands from the hidden truth.
///
/// An update whose innovation covariance is singular is skipped with a warning
/// and the run continues on the predicted estimate. Any other filter error ends the run.
pub fn run_calibration(config: &ScenarioConfig, rng: SimulationRng) -> Result<RunReport, SimError> {
    let params = config.calibration.unwrap_or_default();
    let mut generator = LinearDriftCalibration::with_params(params, rng.0)?;
    generator.iterate(config.simulation.steps);
    info!(
        steps = generator.len(),
        start = params.start_value,
        drift = params.drift,
        noise_range = params.noise_range,
        "Generated calibration sequence"
    );

    let filter = &config.filter;
    let h = filter.measurement_matrix.as_ref();
    let mut process = filter.build_process()?;

    let mut steps = Vec::with_capacity(generator.len());
    let mut measurement_errors = Vec::with_capacity(generator.len());
    let mut estimate_errors = Vec::with_capacity(generator.len());
    let mut skipped_updates = 0;

    for (index, record) in generator.records().enumerate() {
        process.predict(filter.control())?;

        let updated = match process.update(
            record.measured_state,
            record.measurement_covariance,
            h,
        ) {
            Ok(()) => true,
            Err(FilterError::SingularInnovationCovariance {
                reciprocal_condition,
            }) => {
                warn!(
                    step = index,
                    reciprocal_condition, "Skipping update: innovation covariance is singular"
                );
                skipped_updates += 1;
                false
            }
            Err(e) => return Err(e.into()),
        };

        let truth = record.hidden_state[0];
        let measured = record.measured_state[0];
        let estimate = observed(process.state(), h)[0];
        let error = estimate - truth;
        debug!(
            "Step {:>3} | truth {:>10.2} | measured {:>10.2} | estimate {:>10.2} | error {:>9.3}",
            index, truth, measured, estimate, error
        );

        measurement_errors.push(measured - truth);
        estimate_errors.push(error);

        let gain = match (updated, process.debug().last()) {
            (true, Some(snapshot)) => Some(snapshot.gain.clone()),
            _ => None,
        };
        steps.push(StepReport {
            index,
            truth: Some(truth),
            measured: Some(measured),
            updated,
            state: process.state().clone(),
            covariance: process.covariance().clone(),
            gain,
            reference_state: None,
        });
    }

    let summary = Summary {
        steps: steps.len(),
        skipped_updates,
        measurement_rms_error: rms(&measurement_errors),
        estimate_rms_error: rms(&estimate_errors),
        max_divergence: None,
    };
    info!(
        "Calibration finished: {} steps, {} skipped | RMS error measured {:.3}, estimated {:.3}",
        summary.steps,
        summary.skipped_updates,
        summary.measurement_rms_error.unwrap_or(f64::NAN),
        summary.estimate_rms_error.unwrap_or(f64::NAN),
    );

    Ok(RunReport {
        mode: RunMode::Calibration,
        seed: config.simulation.seed,
        summary,
        steps,
    })
}

/// Replays the `[validation]` sequence through the filter process and the
/// reference filter, failing when they disagree by more than [`DIVERGENCE_TOLERANCE`].
pub fn run_validation(config: &ScenarioConfig) -> Result<RunReport, SimError> {
    let validation = config
        .validation
        .as_ref()
        .ok_or(SimError::MissingSection {
            mode: "validation",
            section: "validation",
        })?;
    let filter = &config.filter;

    let mut reference = ReferenceDataSet::new(
        ProcessModel {
            transition: filter.transition.clone(),
            control: Some(validation.control_matrix.clone()),
            process_noise: filter.process_noise.clone(),
            initial_state: filter.initial_state.clone(),
            initial_covariance: filter.initial_covariance.clone(),
        },
        MeasurementModel {
            matrix: validation.measurement_matrix.clone(),
            noise: validation.measurement_covariance.clone(),
        },
        validation.measurements.clone(),
        validation.controls.clone(),
    )?;
    reference.generate()?;

    let mut process = filter.build_process()?;
    let b = &validation.control_matrix;
    let h = &validation.measurement_matrix;
    let r = &validation.measurement_covariance;

    let mut states = Vec::with_capacity(validation.measurements.len());
    let mut covariances = Vec::with_capacity(validation.measurements.len());
    for (y, u) in validation.measurements.iter().zip(&validation.controls) {
        process.predict(Some((b, u)))?;
        process.update(y, r, Some(h))?;
        states.push(process.state().clone());
        covariances.push(process.covariance().clone());
    }

    let divergence = max_divergence(
        &states,
        &covariances,
        reference.state_estimations(),
        reference.error_covariances(),
    );
    if divergence.is_nan() || divergence > DIVERGENCE_TOLERANCE {
        warn!(
            divergence,
            tolerance = DIVERGENCE_TOLERANCE,
            "Filter process disagrees with the reference filter"
        );
        return Err(SimError::Divergence {
            divergence,
            tolerance: DIVERGENCE_TOLERANCE,
        });
    }
    info!(
        "Validation passed: {} steps, max divergence {:e}",
        states.len(),
        divergence
    );

    let steps = states
        .into_iter()
        .zip(covariances)
        .zip(reference.state_estimations())
        .enumerate()
        .map(|(index, ((state, covariance), reference_state))| StepReport {
            index,
            truth: None,
            measured: None,
            updated: true,
            state,
            covariance,
            gain: process.debug().get(index).map(|s| s.gain.clone()),
            reference_state: Some(reference_state.clone()),
        })
        .collect::<Vec<_>>();

    Ok(RunReport {
        mode: RunMode::Validation,
        seed: None,
        summary: Summary {
            steps: steps.len(),
            max_divergence: Some(divergence),
            ..Summary::default()
        },
        steps,
    })
}

/// The estimate expressed in measurement space.
fn observed(state: &State, measurement_matrix: Option<&Matrix>) -> State {
    match measurement_matrix {
        Some(h) => h * state,
        None => state.clone(),
    }
}

fn rms(errors: &[f64]) -> Option<f64> {
    if errors.is_empty() {
        return None;
    }
    let mean_square = errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64;
    Some(mean_square.sqrt())
}
