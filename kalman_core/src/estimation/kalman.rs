// kalman_core/src/estimation/kalman.rs

use dyn_clone::DynClone;
use std::fmt::Debug;

use crate::error::FilterError;
use crate::types::{ensure_shape, Control, Covariance, Matrix, Measurement, State};

/// The a priori estimate produced by a prediction step.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub state: State,
    pub covariance: Covariance,
}

/// The a posteriori estimate produced by an update step, together with the gain
/// that blended the measurement in.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub state: State,
    pub covariance: Covariance,
    pub gain: Matrix,
}

// --- FILTER CORE TRAIT ---
// The seam between the stateful process and the math. `KalmanFilterProcess` only
// ever talks to this trait, so a scripted implementation can stand in for tests.
pub trait KalmanCore: DynClone + Debug + Send + Sync {
    /// Extrapolates `(x, P)` one step: `x' = A*x + B*u`, `P' = A*P*A^T + Q`.
    fn predict(
        &self,
        a: &Matrix,
        x: &State,
        b: &Matrix,
        u: &Control,
        p: &Covariance,
        q: &Covariance,
    ) -> Result<Prediction, FilterError>;

    /// Blends measurement `y` into `(x, P)` through observation matrix `h`.
    fn update(
        &self,
        x: &State,
        y: &Measurement,
        p: &Covariance,
        h: &Matrix,
        r: &Covariance,
    ) -> Result<Correction, FilterError>;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn KalmanCore>`.
dyn_clone::clone_trait_object!(KalmanCore);

/// The standard discrete linear Kalman recurrence, delegating to [`kf_predict`]
/// and [`kf_update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKalmanCore;

impl KalmanCore for LinearKalmanCore {
    fn predict(
        &self,
        a: &Matrix,
        x: &State,
        b: &Matrix,
        u: &Control,
        p: &Covariance,
        q: &Covariance,
    ) -> Result<Prediction, FilterError> {
        kf_predict(a, x, b, u, p, q)
    }

    fn update(
        &self,
        x: &State,
        y: &Measurement,
        p: &Covariance,
        h: &Matrix,
        r: &Covariance,
    ) -> Result<Correction, FilterError> {
        kf_update(x, y, p, h, r)
    }
}

/// PURE FUNCTION: Performs one prediction step.
///
/// # Arguments
/// * `a`: State transition matrix, `n x n`.
/// * `x`: Current state estimate, length `n`.
/// * `b`: Control matrix, `n x k`.
/// * `u`: Control vector, length `k`.
/// * `p`: Current covariance, `n x n`.
/// * `q`: Process noise, `n x n`.
///
/// # Returns
/// The extrapolated `(x', P')`, or `DimensionMismatch` if any operand is non-conforming.
pub fn kf_predict(
    a: &Matrix,
    x: &State,
    b: &Matrix,
    u: &Control,
    p: &Covariance,
    q: &Covariance,
) -> Result<Prediction, FilterError> {
    let n = x.len();
    ensure_shape("A", a, n, n)?;
    ensure_shape("B", b, n, u.len())?;
    ensure_shape("P", p, n, n)?;
    ensure_shape("Q", q, n, n)?;

    // State extrapolation
    let state = a * x + b * u;

    // Covariance extrapolation
    let covariance = a * p * a.transpose() + q;

    Ok(Prediction { state, covariance })
}

/// PURE FUNCTION: Performs one measurement update step.
///
/// Uses the plain `P'' = P - K*H*P` covariance form; the result is not
/// re-symmetrised.
///
/// # Arguments
/// * `x`: Predicted state, length `n`.
/// * `y`: Measurement, length `m`.
/// * `p`: Predicted covariance, `n x n`.
/// * `h`: Observation matrix, `m x n`.
/// * `r`: Measurement noise covariance, `m x m`.
pub fn kf_update(
    x: &State,
    y: &Measurement,
    p: &Covariance,
    h: &Matrix,
    r: &Covariance,
) -> Result<Correction, FilterError> {
    let n = x.len();
    let m = y.len();
    ensure_shape("P", p, n, n)?;
    ensure_shape("H", h, m, n)?;
    ensure_shape("R", r, m, m)?;

    let h_t = h.transpose();

    // 1. Predicted measurement and innovation covariance.
    let y_pred = h * x;
    let s = h * p * &h_t + r;

    // 2. Kalman gain.
    let s_inv = invert_innovation(&s)?;
    let gain = p * &h_t * s_inv;

    // 3. A posteriori estimate.
    let state = x + &gain * (y - y_pred);
    let covariance = p - &gain * h * p;

    Ok(Correction {
        state,
        covariance,
        gain,
    })
}

/// Inverts `S`, rejecting singular and badly conditioned matrices rather than
/// handing back an inverse full of garbage.
fn invert_innovation(s: &Covariance) -> Result<Covariance, FilterError> {
    let s_inv = s
        .clone()
        .try_inverse()
        .ok_or(FilterError::SingularInnovationCovariance {
            reciprocal_condition: 0.0,
        })?;

    if s_inv.iter().any(|v| !v.is_finite()) {
        return Err(FilterError::SingularInnovationCovariance {
            reciprocal_condition: 0.0,
        });
    }

    // 1-norm reciprocal condition of the unit-diagonal scaling `D^-1/2 S D^-1/2`,
    // so operands measured in very different units are not mistaken for singular.
    // NaN fails the comparison too.
    let scale = diagonal_scale(s);
    let scaled = Matrix::from_fn(s.nrows(), s.ncols(), |i, j| s[(i, j)] * scale[i] * scale[j]);
    let scaled_inv =
        Matrix::from_fn(s.nrows(), s.ncols(), |i, j| s_inv[(i, j)] / (scale[i] * scale[j]));
    let reciprocal_condition = 1.0 / (one_norm(&scaled) * one_norm(&scaled_inv));
    if !(reciprocal_condition >= f64::EPSILON) {
        return Err(FilterError::SingularInnovationCovariance {
            reciprocal_condition,
        });
    }

    Ok(s_inv)
}

/// `1 / sqrt(S_ii)` per row. A non-positive or non-finite diagonal entry is left unscaled.
fn diagonal_scale(s: &Covariance) -> Vec<f64> {
    s.diagonal()
        .iter()
        .map(|&d| {
            let factor = 1.0 / d.sqrt();
            if d > 0.0 && factor.is_finite() {
                factor
            } else {
                1.0
            }
        })
        .collect()
}

/// Maximum absolute column sum.
fn one_norm(m: &Matrix) -> f64 {
    m.column_iter()
        .map(|col| col.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::{DMatrix, DVector};

    const EPSILON: f64 = 1e-9;

    fn scaled_identity(n: usize, scale: f64) -> Matrix {
        DMatrix::identity(n, n) * scale
    }

    fn assert_vector_approx_eq(actual: &State, expected: &[f64], epsilon: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(*a, *e, epsilon = epsilon);
        }
    }

    #[test]
    fn test_predict_golden_scaled_identity() {
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let p = scaled_identity(3, 11.0);
        let a = scaled_identity(3, 21.0);
        let q = scaled_identity(3, 31.0);
        let b = scaled_identity(3, 41.0);
        let u = DVector::from_vec(vec![4.0, 5.0, 6.0]);

        let prediction = kf_predict(&a, &x, &b, &u, &p, &q).unwrap();

        // 21 * x + 41 * u
        assert_vector_approx_eq(&prediction.state, &[185.0, 247.0, 309.0], EPSILON);
        // 21 * 11 * 21 + 31
        assert_abs_diff_eq!(prediction.covariance, scaled_identity(3, 4882.0), epsilon = EPSILON);
    }

    #[test]
    fn test_predict_zero_control_reduces_to_transition_only() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);
        let x = DVector::from_vec(vec![3.0, -1.0]);
        let p = DMatrix::from_row_slice(2, 2, &[2.0, 0.3, 0.3, 1.0]);
        let q = scaled_identity(2, 0.1);
        let b = DMatrix::zeros(2, 1);
        let u = DVector::zeros(1);

        let prediction = kf_predict(&a, &x, &b, &u, &p, &q).unwrap();

        assert_eq!(prediction.state, &a * &x);
        assert_eq!(prediction.covariance, &a * &p * a.transpose() + &q);
    }

    #[test]
    fn test_predict_identity_transition_without_noise_is_a_no_op() {
        let a = DMatrix::identity(3, 3);
        let x = DVector::from_vec(vec![0.25, -7.0, 12.5]);
        let p = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0]);
        let b = DMatrix::zeros(3, 3);
        let u = DVector::zeros(3);
        let q = DMatrix::zeros(3, 3);

        let prediction = kf_predict(&a, &x, &b, &u, &p, &q).unwrap();

        assert_eq!(prediction.state, x);
        assert_eq!(prediction.covariance, p);
    }

    #[test]
    fn test_predict_accepts_non_square_control() {
        let a = DMatrix::identity(2, 2);
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let b = DMatrix::from_row_slice(2, 1, &[0.5, 1.0]);
        let u = DVector::from_vec(vec![2.0]);
        let p = DMatrix::identity(2, 2);
        let q = DMatrix::zeros(2, 2);

        let prediction = kf_predict(&a, &x, &b, &u, &p, &q).unwrap();
        assert_vector_approx_eq(&prediction.state, &[2.0, 3.0], EPSILON);
    }

    #[test]
    fn test_predict_rejects_mismatched_operands() {
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let i3 = DMatrix::identity(3, 3);
        let i2 = DMatrix::identity(2, 2);
        let u3 = DVector::zeros(3);
        let u2 = DVector::zeros(2);

        let err = kf_predict(&i2, &x, &i3, &u3, &i3, &i3).unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { operand: "A", .. }));

        let err = kf_predict(&i3, &x, &i3, &u2, &i3, &i3).unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { operand: "B", .. }));

        let err = kf_predict(&i3, &x, &i3, &u3, &i2, &i3).unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { operand: "P", .. }));

        let err = kf_predict(&i3, &x, &i3, &u3, &i3, &i2).unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { operand: "Q", .. }));
    }

    #[test]
    fn test_update_golden_identity_measurement() {
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let p = DMatrix::identity(3, 3);
        let h = DMatrix::identity(3, 3);
        let r = scaled_identity(3, 5.0);
        let y = DVector::from_vec(vec![1.0, 0.5, 0.2]);

        let correction = kf_update(&x, &y, &p, &h, &r).unwrap();

        assert_abs_diff_eq!(correction.gain, scaled_identity(3, 1.0 / 6.0), epsilon = EPSILON);
        assert_vector_approx_eq(
            &correction.state,
            &[
                1.0 + (1.0 - 1.0) / 6.0,
                2.0 + (0.5 - 2.0) / 6.0,
                3.0 + (0.2 - 3.0) / 6.0,
            ],
            EPSILON,
        );
        assert_abs_diff_eq!(correction.covariance, scaled_identity(3, 5.0 / 6.0), epsilon = EPSILON);
    }

    #[test]
    fn test_update_with_huge_measurement_noise_ignores_measurement() {
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let p = DMatrix::identity(3, 3);
        let h = DMatrix::identity(3, 3);
        let r = scaled_identity(3, 1e12);
        let y = DVector::from_vec(vec![100.0, -50.0, 7.0]);

        let correction = kf_update(&x, &y, &p, &h, &r).unwrap();

        assert!(correction.gain.iter().all(|k| k.abs() < 1e-11));
        assert_vector_approx_eq(&correction.state, &[1.0, 2.0, 3.0], 1e-9);
    }

    #[test]
    fn test_update_with_vanishing_measurement_noise_trusts_measurement() {
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let p = DMatrix::identity(2, 2);
        let h = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 1.0, 4.0]);
        let r = scaled_identity(2, 1e-12);
        let y = DVector::from_vec(vec![6.0, 11.0]);

        let correction = kf_update(&x, &y, &p, &h, &r).unwrap();

        // H^-1 * y for the lower-triangular H above.
        let expected = h.clone().try_inverse().unwrap() * &y;
        assert_vector_approx_eq(&correction.state, expected.as_slice(), 1e-6);
    }

    #[test]
    fn test_update_with_partial_observation() {
        // Position/velocity state, only position is observed.
        let x = DVector::from_vec(vec![10.0, 1.0]);
        let p = DMatrix::identity(2, 2) * 4.0;
        let h = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let r = DMatrix::from_element(1, 1, 4.0);
        let y = DVector::from_vec(vec![12.0]);

        let correction = kf_update(&x, &y, &p, &h, &r).unwrap();

        assert_eq!(correction.gain.shape(), (2, 1));
        assert_abs_diff_eq!(correction.gain[(0, 0)], 0.5, epsilon = EPSILON);
        assert_abs_diff_eq!(correction.gain[(1, 0)], 0.0, epsilon = EPSILON);
        assert_vector_approx_eq(&correction.state, &[11.0, 1.0], EPSILON);
        assert_abs_diff_eq!(correction.covariance[(0, 0)], 2.0, epsilon = EPSILON);
        assert_abs_diff_eq!(correction.covariance[(1, 1)], 4.0, epsilon = EPSILON);
    }

    #[test]
    fn test_update_singular_innovation_is_reported() {
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let p = DMatrix::zeros(2, 2);
        let h = DMatrix::identity(2, 2);
        let r = DMatrix::zeros(2, 2);
        let y = DVector::from_vec(vec![1.0, 1.0]);

        let err = kf_update(&x, &y, &p, &h, &r).unwrap_err();
        assert!(matches!(err, FilterError::SingularInnovationCovariance { .. }));
    }

    #[test]
    fn test_update_ill_conditioned_innovation_is_reported() {
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let p = DMatrix::zeros(2, 2);
        let h = DMatrix::identity(2, 2);
        // Invertible, but only two ulps away from rank one.
        let r = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0 + 2.0 * f64::EPSILON]);
        let y = DVector::from_vec(vec![1.0, 1.0]);

        let err = kf_update(&x, &y, &p, &h, &r).unwrap_err();
        assert!(matches!(err, FilterError::SingularInnovationCovariance { .. }));
    }

    #[test]
    fn test_update_accepts_badly_scaled_innovation() {
        // Millimetres next to kilometres: S = diag(2e-9, 2e9) is perfectly invertible.
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let p = DMatrix::from_diagonal(&DVector::from_vec(vec![1e-9, 1e9]));
        let h = DMatrix::identity(2, 2);
        let r = p.clone();
        let y = DVector::from_vec(vec![1e-6, 1e6]);

        let correction = kf_update(&x, &y, &p, &h, &r).unwrap();

        assert_abs_diff_eq!(correction.gain, DMatrix::identity(2, 2) * 0.5, epsilon = 1e-12);
        assert_relative_eq!(correction.state[0], 0.5e-6, max_relative = 1e-12);
        assert_relative_eq!(correction.state[1], 0.5e6, max_relative = 1e-12);
        assert_relative_eq!(correction.covariance[(0, 0)], 0.5e-9, max_relative = 1e-12);
        assert_relative_eq!(correction.covariance[(1, 1)], 0.5e9, max_relative = 1e-12);
    }

    #[test]
    fn test_update_rejects_mismatched_operands() {
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let p = DMatrix::identity(3, 3);
        let r = DMatrix::identity(2, 2);

        // H must be m x n = 2 x 3.
        let h = DMatrix::identity(3, 3);
        let err = kf_update(&x, &y, &p, &h, &r).unwrap_err();
        assert_eq!(
            err,
            FilterError::DimensionMismatch {
                operand: "H",
                expected: (2, 3),
                actual: (3, 3),
            }
        );

        let h = DMatrix::zeros(2, 3);
        let r_bad = DMatrix::identity(3, 3);
        let err = kf_update(&x, &y, &p, &h, &r_bad).unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { operand: "R", .. }));
    }

    #[test]
    fn test_core_is_deterministic() {
        let core = LinearKalmanCore;
        let x = DVector::from_vec(vec![0.3, 0.7]);
        let p = DMatrix::from_row_slice(2, 2, &[1.3, 0.2, 0.2, 0.9]);
        let h = DMatrix::from_row_slice(1, 2, &[0.4, 1.1]);
        let r = DMatrix::from_element(1, 1, 0.37);
        let y = DVector::from_vec(vec![1.9]);

        let first = core.update(&x, &y, &p, &h, &r).unwrap();
        let second = core.update(&x, &y, &p, &h, &r).unwrap();
        assert_eq!(first, second);
    }
}
