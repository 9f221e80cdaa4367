// kalman_core/src/error.rs

use thiserror::Error;

/// Failures raised by the filter recurrence. Both are fatal to the call that
/// detected them and leave any held estimate untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// An operand does not have the shape the call requires.
    /// Vectors are reported as `(len, 1)`.
    #[error("dimension mismatch for `{operand}`: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        operand: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The innovation covariance `S = H*P*H^T + R` cannot be inverted reliably.
    #[error("innovation covariance is singular (reciprocal condition {reciprocal_condition:e})")]
    SingularInnovationCovariance { reciprocal_condition: f64 },

    /// A process configured without implicit defaults was called without an operand.
    #[error("`{operand}` must be supplied explicitly for this process configuration")]
    MissingOperand { operand: &'static str },
}

/// Invalid parameters for a synthetic measurement generator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("noise range must be non-negative and at most f64::MAX / 4, got {0}")]
    InvalidNoiseRange(f64),
    #[error("`{name}` must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },
}
