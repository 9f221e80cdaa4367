// kalman_sim/src/config/serde_helpers.rs

//! Matrices are written as arrays of rows (`[[1.0, 0.0], [0.0, 1.0]]`) and
//! vectors as flat arrays. Ragged rows are rejected at deserialisation time.

use nalgebra::DMatrix;

fn matrix_from_rows(rows: Vec<Vec<f64>>) -> Result<DMatrix<f64>, String> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(format!(
            "matrix row {} has {} entries, expected {}",
            i,
            row.len(),
            ncols
        ));
    }
    Ok(DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
}

fn rows_of(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

pub mod dmatrix_rows {
    use nalgebra::DMatrix;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(matrix: &DMatrix<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(super::rows_of(matrix))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DMatrix<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows: Vec<Vec<f64>> = Deserialize::deserialize(deserializer)?;
        super::matrix_from_rows(rows).map_err(D::Error::custom)
    }
}

/// For `#[serde(default, with = ...)]` fields; a missing key stays `None`.
pub mod option_dmatrix_rows {
    use nalgebra::DMatrix;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(matrix: &Option<DMatrix<f64>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match matrix {
            Some(m) => serializer.serialize_some(&super::rows_of(m)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DMatrix<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows: Option<Vec<Vec<f64>>> = Deserialize::deserialize(deserializer)?;
        rows.map(super::matrix_from_rows)
            .transpose()
            .map_err(D::Error::custom)
    }
}

pub mod dvector {
    use nalgebra::DVector;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(vector: &DVector<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(vector.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DVector<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: Vec<f64> = Deserialize::deserialize(deserializer)?;
        Ok(DVector::from_vec(values))
    }
}

pub mod option_dvector {
    use nalgebra::DVector;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(vector: &Option<DVector<f64>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match vector {
            Some(v) => serializer.serialize_some(v.as_slice()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DVector<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: Option<Vec<f64>> = Deserialize::deserialize(deserializer)?;
        Ok(values.map(DVector::from_vec))
    }
}

/// A sequence of vectors, one per step. Read-only: used via `deserialize_with`.
pub mod dvector_list {
    use nalgebra::DVector;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<DVector<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values: Vec<Vec<f64>> = Deserialize::deserialize(deserializer)?;
        Ok(values.into_iter().map(DVector::from_vec).collect())
    }
}
