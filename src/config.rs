//! Filter configuration
//!
//! Noise standard deviations and sensor switches, fixed at construction.
//!
//! # Example
//!
//! ```
//! use ctrv_ukf::UkfConfig;
//!
//! let config = UkfConfig::from_yaml_str("std_accel: 1.5\nuse_nonlinear_sensor: false\n").unwrap();
//! assert_eq!(config.std_accel, 1.5);
//! assert!(!config.use_nonlinear_sensor);
//! assert_eq!(config.std_yaw_accel, 0.6);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A standard deviation is zero, negative or not finite
    #[error("{name} must be finite and positive, got {value}")]
    InvalidStdDev { name: &'static str, value: f64 },
}

/// Noise parameters and sensor switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UkfConfig {
    /// Process linear sensor measurements (the first measurement may still seed the clock)
    pub use_linear_sensor: bool,
    /// Process nonlinear sensor measurements
    pub use_nonlinear_sensor: bool,
    /// Longitudinal acceleration noise [m/s²]
    pub std_accel: f64,
    /// Yaw acceleration noise [rad/s²]
    pub std_yaw_accel: f64,
    /// Linear sensor noise, x position [m]
    pub std_pos1: f64,
    /// Linear sensor noise, y position [m]
    pub std_pos2: f64,
    /// Nonlinear sensor range noise [m]
    pub std_range: f64,
    /// Nonlinear sensor bearing noise [rad]
    pub std_bearing: f64,
    /// Nonlinear sensor range-rate noise [m/s]
    pub std_range_rate: f64,
}

impl Default for UkfConfig {
    fn default() -> Self {
        Self {
            use_linear_sensor: true,
            use_nonlinear_sensor: true,
            std_accel: 0.8,
            std_yaw_accel: 0.6,
            std_pos1: 0.15,
            std_pos2: 0.15,
            std_range: 0.3,
            std_bearing: 0.03,
            std_range_rate: 0.3,
        }
    }
}

impl UkfConfig {
    /// Parses a YAML document; missing keys take their default values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Checks that every standard deviation is finite and strictly positive.
    ///
    /// Zero process noise would make the augmented covariance singular, which
    /// the Cholesky factorisation rejects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("std_accel", self.std_accel),
            ("std_yaw_accel", self.std_yaw_accel),
            ("std_pos1", self.std_pos1),
            ("std_pos2", self.std_pos2),
            ("std_range", self.std_range),
            ("std_bearing", self.std_bearing),
            ("std_range_rate", self.std_range_rate),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidStdDev { name, value });
            }
        }
        Ok(())
    }

    /// Returns a copy with the linear sensor switched on or off.
    pub fn with_linear_sensor(mut self, enabled: bool) -> Self {
        self.use_linear_sensor = enabled;
        self
    }

    /// Returns a copy with the nonlinear sensor switched on or off.
    pub fn with_nonlinear_sensor(mut self, enabled: bool) -> Self {
        self.use_nonlinear_sensor = enabled;
        self
    }

    /// Returns a copy with the given process noise standard deviations.
    pub fn with_process_noise(mut self, std_accel: f64, std_yaw_accel: f64) -> Self {
        self.std_accel = std_accel;
        self.std_yaw_accel = std_yaw_accel;
        self
    }
}
