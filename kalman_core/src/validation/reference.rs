// kalman_core/src/validation/reference.rs

use nalgebra::{Cholesky, DMatrix};

use crate::error::FilterError;
use crate::types::{ensure_len, ensure_shape, Control, Covariance, Matrix, Measurement, State};
use crate::validation::ReferenceFilter;

/// The process half of a reference filter's fixed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessModel {
    /// `A`, `n x n`.
    pub transition: Matrix,
    /// `B`, `n x k`. Without it the filter only accepts `predict(None)`.
    pub control: Option<Matrix>,
    /// `Q`, `n x n`.
    pub process_noise: Covariance,
    /// `x0`, length `n`.
    pub initial_state: State,
    /// `P0`, `n x n`.
    pub initial_covariance: Covariance,
}

/// The measurement half: one `H` and one `R` for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementModel {
    /// `H`, `m x n`.
    pub matrix: Matrix,
    /// `R`, `m x m`.
    pub noise: Covariance,
}

/// An independent Kalman filter used to cross-check [`crate::estimation::kf_update`].
///
/// The gain is obtained by solving `S * K^T = H * P^T` through a Cholesky
/// factorisation instead of inverting `S`, and the covariance is updated as
/// `(I - K*H) * P`. For well-conditioned inputs both paths agree to rounding.
#[derive(Debug, Clone)]
pub struct ReferenceKalmanFilter {
    transition: Matrix,
    control: Option<Matrix>,
    process_noise: Covariance,
    measurement_matrix: Matrix,
    measurement_noise: Covariance,
    state: State,
    covariance: Covariance,
}

impl ReferenceKalmanFilter {
    pub fn new(process: ProcessModel, measurement: MeasurementModel) -> Result<Self, FilterError> {
        let n = process.initial_state.len();
        ensure_shape("A", &process.transition, n, n)?;
        ensure_shape("Q", &process.process_noise, n, n)?;
        ensure_shape("P", &process.initial_covariance, n, n)?;
        if let Some(b) = &process.control {
            ensure_shape("B", b, n, b.ncols())?;
        }

        let m = measurement.matrix.nrows();
        ensure_shape("H", &measurement.matrix, m, n)?;
        ensure_shape("R", &measurement.noise, m, m)?;

        Ok(Self {
            transition: process.transition,
            control: process.control,
            process_noise: process.process_noise,
            measurement_matrix: measurement.matrix,
            measurement_noise: measurement.noise,
            state: process.initial_state,
            covariance: process.initial_covariance,
        })
    }

    pub fn state_dimension(&self) -> usize {
        self.state.len()
    }

    pub fn measurement_dimension(&self) -> usize {
        self.measurement_matrix.nrows()
    }
}

impl ReferenceFilter for ReferenceKalmanFilter {
    fn predict(&mut self, control: Option<&Control>) -> Result<(), FilterError> {
        let mut state = &self.transition * &self.state;
        if let Some(u) = control {
            let b = self.control.as_ref().ok_or(FilterError::MissingOperand {
                operand: "control matrix",
            })?;
            ensure_len("u", u, b.ncols())?;
            state += b * u;
        }

        self.covariance =
            &self.transition * &self.covariance * self.transition.transpose() + &self.process_noise;
        self.state = state;
        Ok(())
    }

    fn correct(&mut self, z: &Measurement) -> Result<(), FilterError> {
        ensure_len("z", z, self.measurement_dimension())?;

        let h = &self.measurement_matrix;
        let s = h * &self.covariance * h.transpose() + &self.measurement_noise;
        let innovation = z - h * &self.state;

        let cholesky = Cholesky::new(s).ok_or(FilterError::SingularInnovationCovariance {
            reciprocal_condition: 0.0,
        })?;
        let gain = cholesky.solve(&(h * self.covariance.transpose())).transpose();

        let n = self.state_dimension();
        self.state = &self.state + &gain * innovation;
        self.covariance = (DMatrix::identity(n, n) - &gain * h) * &self.covariance;
        Ok(())
    }

    fn state_estimation(&self) -> State {
        self.state.clone()
    }

    fn error_covariance(&self) -> Covariance {
        self.covariance.clone()
    }
}
