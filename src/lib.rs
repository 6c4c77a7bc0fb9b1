//! CTRV-UKF: Unscented Kalman Filter for single-object tracking
//!
//! Estimates position, speed, heading and yaw rate of a moving object from two
//! asynchronous sensor streams:
//!
//! - a linear sensor reporting Cartesian position `(px, py)`
//! - a nonlinear sensor reporting `(range, bearing, range_rate)`
//!
//! The motion model is Constant Turn Rate and Velocity (CTRV) with process noise
//! injected through an augmented state.
//!
//! # Features
//!
//! - **Type Safety**: State, augmented, measurement and innovation vectors live in
//!   distinct vector spaces and cannot be mixed
//! - **Fixed Size**: All matrices are stack allocated with compile-time dimensions
//! - **Explicit Failure Modes**: Numerical failures are reported with context,
//!   recoverable geometry issues are surfaced as skipped updates

pub mod config;
pub mod filters;
pub mod models;
pub mod types;
pub mod utils;

pub use config::{ConfigError, UkfConfig};

pub mod prelude {
    pub use crate::config::UkfConfig;
    pub use crate::filters::sigma::{SigmaPoints, SigmaWeights};
    pub use crate::filters::ukf::{SkipReason, StepOutcome, UnscentedKalmanFilter};
    pub use crate::models::*;
    pub use crate::types::angle::normalize_angle;
    pub use crate::types::measurement::{Measurement, Reading, SensorKind};
    pub use crate::types::phase::FilterPhase;
    pub use crate::types::spaces::*;
    pub use crate::utils::*;
    pub use crate::{Result, UkfError};
}

use thiserror::Error;

use crate::types::measurement::SensorKind;

/// Error types for the library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UkfError {
    /// Augmented covariance could not be Cholesky-factorised during prediction.
    ///
    /// `sub_step` is the zero-based index of the prediction sub-step that failed.
    #[error("augmented covariance is not positive definite (prediction sub-step {sub_step})")]
    NotPositiveDefinite { sub_step: usize },

    /// Innovation covariance S could not be inverted
    #[error("innovation covariance is singular during {sensor} update")]
    SingularInnovation { sensor: SensorKind },

    /// A predicted sigma point sits exactly at the sensor origin
    #[error("measurement mapping undefined at sigma point {sigma_index} (zero position)")]
    DegenerateGeometry { sigma_index: usize },

    /// An update was requested before the first measurement seeded the filter
    #[error("filter has not been initialized")]
    NotInitialized,

    /// An update was requested without a preceding prediction
    #[error("update requested without a preceding prediction")]
    MissingPrediction,

    /// A prediction was requested with a negative time step
    #[error("time step must be non-negative")]
    NegativeTimeStep,

    /// A measurement arrived with a timestamp earlier than the filter clock
    #[error("measurement timestamp {timestamp_us} precedes filter clock {clock_us}")]
    OutOfOrderMeasurement { timestamp_us: i64, clock_us: i64 },

    /// Raw measurement values do not match the sensor kind
    #[error("{sensor} measurement expects {expected} values, got {actual}")]
    MeasurementDimension {
        sensor: SensorKind,
        expected: usize,
        actual: usize,
    },

    /// Raw measurement contains NaN or infinity
    #[error("{sensor} measurement contains a non-finite value")]
    NonFiniteMeasurement { sensor: SensorKind },

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<ConfigError> for UkfError {
    fn from(err: ConfigError) -> Self {
        UkfError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = ::core::result::Result<T, UkfError>;
