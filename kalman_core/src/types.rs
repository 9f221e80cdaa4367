// kalman_core/src/types.rs

use nalgebra::{DMatrix, DVector};

use crate::error::FilterError;

// --- Core Type Aliases ---
pub type State = DVector<f64>;
pub type Control = DVector<f64>;
pub type Measurement = DVector<f64>;
pub type Matrix = DMatrix<f64>;
pub type Covariance = DMatrix<f64>;

// --- Shape Contracts ---
// Every operand is checked before any arithmetic so nalgebra never panics on a
// non-conforming product.

/// Fails with `DimensionMismatch` unless `m` is exactly `rows x cols`.
pub fn ensure_shape(
    operand: &'static str,
    m: &DMatrix<f64>,
    rows: usize,
    cols: usize,
) -> Result<(), FilterError> {
    if m.nrows() == rows && m.ncols() == cols {
        Ok(())
    } else {
        Err(FilterError::DimensionMismatch {
            operand,
            expected: (rows, cols),
            actual: m.shape(),
        })
    }
}

/// Fails with `DimensionMismatch` unless `v` has exactly `len` entries.
pub fn ensure_len(operand: &'static str, v: &DVector<f64>, len: usize) -> Result<(), FilterError> {
    if v.len() == len {
        Ok(())
    } else {
        Err(FilterError::DimensionMismatch {
            operand,
            expected: (len, 1),
            actual: (v.len(), 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_shape_reports_expected_and_actual() {
        let m = DMatrix::<f64>::zeros(2, 3);
        assert!(ensure_shape("A", &m, 2, 3).is_ok());

        match ensure_shape("A", &m, 3, 3) {
            Err(FilterError::DimensionMismatch {
                operand,
                expected,
                actual,
            }) => {
                assert_eq!(operand, "A");
                assert_eq!(expected, (3, 3));
                assert_eq!(actual, (2, 3));
            }
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_len_treats_vectors_as_columns() {
        let v = DVector::from_vec(vec![1.0, 2.0]);
        assert!(ensure_len("x", &v, 2).is_ok());
        assert_eq!(
            ensure_len("x", &v, 3),
            Err(FilterError::DimensionMismatch {
                operand: "x",
                expected: (3, 1),
                actual: (2, 1),
            })
        );
    }
}
