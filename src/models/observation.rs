//! Observation (sensor) models
//!
//! Map a predicted state into a sensor's measurement space. Both sensors share
//! the same unscented update; what differs is captured by
//! [`MeasurementModel`]: the mapping, which component (if any) is an angle,
//! and the additive noise covariance.

use nalgebra::RealField;
use num_traits::Float;

use crate::types::measurement::SensorKind;
use crate::types::spaces::{MeasurementCovariance, MeasurementVector, StateVector};

/// Trait for sensors consumed by the unscented update.
pub trait MeasurementModel<T: RealField, const M: usize> {
    /// Which sensor this model describes.
    fn kind(&self) -> SensorKind;

    /// Maps a state into measurement space.
    ///
    /// Returns `None` where the mapping is undefined.
    fn observe(&self, state: &StateVector<T>) -> Option<MeasurementVector<T, M>>;

    /// Index of the measurement component holding an angle, if any.
    ///
    /// Residuals of that component are wrapped into `(-π, π]`.
    fn angle_index(&self) -> Option<usize> {
        None
    }

    /// Additive measurement noise covariance R.
    fn measurement_noise(&self) -> &MeasurementCovariance<T, M>;
}

// ============================================================================
// Linear position sensor
// ============================================================================

/// Position-only sensor in 2D.
///
/// Observes `[px, py]` from state `[px, py, v, yaw, yaw_rate]`.
#[derive(Debug, Clone)]
pub struct PositionSensor<T: RealField> {
    noise: MeasurementCovariance<T, 2>,
}

impl<T: RealField + Float + Copy> PositionSensor<T> {
    /// Creates a position sensor with independent x/y noise.
    ///
    /// # Panics
    /// Panics if `std_px <= 0` or `std_py <= 0`.
    pub fn new(std_px: T, std_py: T) -> Self {
        assert!(std_px > T::zero(), "Measurement noise std_px must be positive");
        assert!(std_py > T::zero(), "Measurement noise std_py must be positive");
        Self {
            noise: MeasurementCovariance::from_diagonal(&nalgebra::vector![
                std_px * std_px,
                std_py * std_py
            ]),
        }
    }
}

impl<T: RealField + Float + Copy> MeasurementModel<T, 2> for PositionSensor<T> {
    fn kind(&self) -> SensorKind {
        SensorKind::Linear
    }

    fn observe(&self, state: &StateVector<T>) -> Option<MeasurementVector<T, 2>> {
        Some(MeasurementVector::from_array([*state.index(0), *state.index(1)]))
    }

    fn measurement_noise(&self) -> &MeasurementCovariance<T, 2> {
        &self.noise
    }
}

// ============================================================================
// Range / bearing / range-rate sensor
// ============================================================================

/// Radar-like sensor located at the origin.
///
/// Observes `[range, bearing, range_rate]`. The mapping is undefined for a
/// state sitting exactly on the sensor, where range-rate divides by zero.
#[derive(Debug, Clone)]
pub struct RangeBearingSensor<T: RealField> {
    noise: MeasurementCovariance<T, 3>,
}

impl<T: RealField + Float + Copy> RangeBearingSensor<T> {
    /// Index of bearing inside the measurement vector.
    pub const BEARING_INDEX: usize = 1;

    /// Creates a new range/bearing/range-rate sensor.
    ///
    /// # Panics
    /// Panics if any noise standard deviation is non-positive.
    pub fn new(std_range: T, std_bearing: T, std_range_rate: T) -> Self {
        assert!(std_range > T::zero(), "Range noise std_range must be positive");
        assert!(std_bearing > T::zero(), "Bearing noise std_bearing must be positive");
        assert!(
            std_range_rate > T::zero(),
            "Range-rate noise std_range_rate must be positive"
        );
        Self {
            noise: MeasurementCovariance::from_diagonal(&nalgebra::vector![
                std_range * std_range,
                std_bearing * std_bearing,
                std_range_rate * std_range_rate
            ]),
        }
    }
}

impl<T: RealField + Float + Copy> MeasurementModel<T, 3> for RangeBearingSensor<T> {
    fn kind(&self) -> SensorKind {
        SensorKind::Nonlinear
    }

    fn observe(&self, state: &StateVector<T>) -> Option<MeasurementVector<T, 3>> {
        let px = *state.index(0);
        let py = *state.index(1);
        let v = *state.index(2);
        let yaw = *state.index(3);

        if px == T::zero() && py == T::zero() {
            return None;
        }

        let v1 = Float::cos(yaw) * v;
        let v2 = Float::sin(yaw) * v;
        let range = Float::sqrt(px * px + py * py);

        Some(MeasurementVector::from_array([
            range,
            Float::atan2(py, px),
            (px * v1 + py * v2) / range,
        ]))
    }

    fn angle_index(&self) -> Option<usize> {
        Some(Self::BEARING_INDEX)
    }

    fn measurement_noise(&self) -> &MeasurementCovariance<T, 3> {
        &self.noise
    }
}
