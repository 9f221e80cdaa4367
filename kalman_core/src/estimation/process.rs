// kalman_core/src/estimation/process.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::FilterError;
use crate::estimation::kalman::{KalmanCore, LinearKalmanCore};
use crate::types::{ensure_len, ensure_shape, Control, Covariance, Matrix, Measurement, State};

/// How a [`KalmanFilterProcess`] resolves omitted operands.
///
/// The two common setups are available as [`ProcessConfig::simple`] and
/// [`ProcessConfig::unconstrained`]; the flags can also be mixed freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    /// Record a [`DebugSnapshot`] after every successful update.
    #[serde(default)]
    pub debug_enabled: bool,
    /// A missing control pair means "no effect": an `n x n` zero `B` and zero `u`.
    #[serde(default = "default_true")]
    pub implicit_control: bool,
    /// A missing measurement matrix means the identity, valid only when `m == n`.
    #[serde(default = "default_true")]
    pub implicit_measurement: bool,
}

fn default_true() -> bool {
    true
}

impl ProcessConfig {
    /// Passively evolving, fully observed state.
    pub fn simple() -> Self {
        Self {
            debug_enabled: false,
            implicit_control: true,
            implicit_measurement: true,
        }
    }

    /// Every predict/update must name its control and measurement matrices.
    pub fn unconstrained() -> Self {
        Self {
            debug_enabled: false,
            implicit_control: false,
            implicit_measurement: false,
        }
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::simple()
    }
}

/// The result of one update step, captured by value.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugSnapshot {
    /// The a posteriori state `x''`.
    pub state: State,
    /// The a posteriori covariance `P''`.
    pub covariance: Covariance,
    /// The Kalman gain `K` used for the step.
    pub gain: Matrix,
    /// The measurement `y` that was fused.
    pub measurement: Measurement,
}

/// A linear Kalman filter that owns its estimate `(x, P)` and fixed system
/// matrices `A` and `Q`, delegating all math to a [`KalmanCore`].
#[derive(Debug, Clone)]
pub struct KalmanFilterProcess {
    config: ProcessConfig,
    /// The current state estimate `x`.
    state: State,
    /// The current covariance `P`. Always `n x n`.
    covariance: Covariance,
    /// The state transition matrix `A`.
    transition: Matrix,
    /// The process noise covariance `Q`.
    process_noise: Covariance,
    core: Box<dyn KalmanCore>,
    history: Vec<DebugSnapshot>,
}

impl KalmanFilterProcess {
    /// Creates a new process using the standard [`LinearKalmanCore`].
    ///
    /// # Arguments
    /// * `config`: Default-operand policy and debug switch.
    /// * `initial_state`: `x0`, length `n`.
    /// * `initial_covariance`: `P0`, `n x n`.
    /// * `transition`: `A`, `n x n`.
    /// * `process_noise`: `Q`, `n x n`.
    pub fn new(
        config: ProcessConfig,
        initial_state: State,
        initial_covariance: Covariance,
        transition: Matrix,
        process_noise: Covariance,
    ) -> Result<Self, FilterError> {
        let n = initial_state.len();
        ensure_shape("P", &initial_covariance, n, n)?;
        ensure_shape("A", &transition, n, n)?;
        ensure_shape("Q", &process_noise, n, n)?;

        Ok(Self {
            config,
            state: initial_state,
            covariance: initial_covariance,
            transition,
            process_noise,
            core: Box::new(LinearKalmanCore),
            history: Vec::new(),
        })
    }

    /// Replaces the filter core the process delegates to.
    pub fn with_core(mut self, core: Box<dyn KalmanCore>) -> Self {
        self.core = core;
        self
    }

    /// Advances the estimate one step.
    ///
    /// `control` is the `(B, u)` pair. When it is `None` the process either
    /// substitutes a zero control of shape `n x n` / `n` or fails with
    /// `MissingOperand`, depending on [`ProcessConfig::implicit_control`].
    /// On failure the held estimate is left untouched.
    pub fn predict(&mut self, control: Option<(&Matrix, &Control)>) -> Result<(), FilterError> {
        let n = self.dim();
        let zero_control;
        let (b, u) = match control {
            Some(pair) => pair,
            None if self.config.implicit_control => {
                zero_control = (Matrix::zeros(n, n), Control::zeros(n));
                (&zero_control.0, &zero_control.1)
            }
            None => {
                let err = FilterError::MissingOperand { operand: "control" };
                return Err(self.reject("predict", err));
            }
        };

        let prediction = self
            .core
            .predict(
                &self.transition,
                &self.state,
                b,
                u,
                &self.covariance,
                &self.process_noise,
            )
            .map_err(|e| self.reject("predict", e))?;

        self.check_estimate(&prediction.state, &prediction.covariance)
            .map_err(|e| self.reject("predict", e))?;

        self.state = prediction.state;
        self.covariance = prediction.covariance;
        trace!(state = ?self.state.as_slice(), "predict");
        Ok(())
    }

    /// Fuses measurement `y` with noise covariance `r`.
    ///
    /// When `measurement_matrix` is `None` and implicit measurement is enabled,
    /// the identity is used, which requires `y` to have the state's dimension.
    /// On failure the held estimate and the debug history are left untouched.
    pub fn update(
        &mut self,
        y: &Measurement,
        r: &Covariance,
        measurement_matrix: Option<&Matrix>,
    ) -> Result<(), FilterError> {
        let n = self.dim();
        let m = y.len();
        let identity;
        let h = match measurement_matrix {
            Some(h) => h,
            None if self.config.implicit_measurement => {
                if m != n {
                    let err = FilterError::DimensionMismatch {
                        operand: "H",
                        expected: (m, n),
                        actual: (m, m),
                    };
                    return Err(self.reject("update", err));
                }
                identity = Matrix::identity(m, m);
                &identity
            }
            None => {
                let err = FilterError::MissingOperand {
                    operand: "measurement matrix",
                };
                return Err(self.reject("update", err));
            }
        };

        let correction = self
            .core
            .update(&self.state, y, &self.covariance, h, r)
            .map_err(|e| self.reject("update", e))?;

        self.check_estimate(&correction.state, &correction.covariance)
            .map_err(|e| self.reject("update", e))?;

        if self.config.debug_enabled {
            self.history.push(DebugSnapshot {
                state: correction.state.clone(),
                covariance: correction.covariance.clone(),
                gain: correction.gain,
                measurement: y.clone(),
            });
        }

        self.state = correction.state;
        self.covariance = correction.covariance;
        trace!(state = ?self.state.as_slice(), "update");
        Ok(())
    }

    /// Every recorded update in call order. Empty unless debugging is enabled.
    pub fn debug(&self) -> &[DebugSnapshot] {
        &self.history
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn covariance(&self) -> &Covariance {
        &self.covariance
    }

    pub fn transition(&self) -> &Matrix {
        &self.transition
    }

    pub fn process_noise(&self) -> &Covariance {
        &self.process_noise
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Returns the dimension `n` of the state vector.
    pub fn dim(&self) -> usize {
        self.state.len()
    }

    // --- Private Helper Methods ---

    /// The core must hand back an estimate of the same dimension it was given.
    fn check_estimate(&self, state: &State, covariance: &Covariance) -> Result<(), FilterError> {
        let n = self.dim();
        ensure_len("x", state, n)?;
        ensure_shape("P", covariance, n, n)
    }

    fn reject(&self, step: &'static str, err: FilterError) -> FilterError {
        debug!(step, error = %err, "rejected filter step, estimate unchanged");
        err
    }
}
