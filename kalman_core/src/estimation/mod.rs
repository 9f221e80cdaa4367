// kalman_core/src/estimation/mod.rs

//! Linear Kalman estimation: the stateless recurrence (`kalman`) and the stateful
//! wrapper that threads the estimate across cycles (`process`).

pub mod kalman;
pub mod process;

pub use kalman::{kf_predict, kf_update, Correction, KalmanCore, LinearKalmanCore, Prediction};
pub use process::{DebugSnapshot, KalmanFilterProcess, ProcessConfig};
