// kalman_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::calibration::MeasurementCalibration;
pub use crate::estimation::kalman::KalmanCore;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::error::{CalibrationError, FilterError};
pub use crate::estimation::process::{DebugSnapshot, KalmanFilterProcess, ProcessConfig};
pub use crate::types::{Control, Covariance, Matrix, Measurement, State};

// --- Estimation Algorithms ---
pub use crate::estimation::kalman::{kf_predict, kf_update, Correction, LinearKalmanCore, Prediction};

// --- Concrete Implementations (Export common ones for convenience) ---
pub use crate::calibration::linear_drift::{LinearDriftCalibration, LinearDriftParams};
pub use crate::validation::{
    MeasurementModel, ProcessModel, ReferenceDataSet, ReferenceFilter, ReferenceKalmanFilter,
    ValidationError,
};
