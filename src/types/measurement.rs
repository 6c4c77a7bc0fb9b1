//! Timestamped sensor measurements
//!
//! A [`Measurement`] is what external producers hand to the filter: a timestamp
//! in microseconds plus a [`Reading`] whose shape is fixed by the sensor kind.

use ::core::fmt;

use nalgebra::RealField;
use num_traits::Float;

use super::spaces::MeasurementVector;
use crate::{Result, UkfError};

/// The two kinds of sensor the filter fuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Cartesian position sensor reporting `(px, py)`
    Linear,
    /// Polar sensor reporting `(range, bearing, range_rate)`
    Nonlinear,
}

impl SensorKind {
    /// Number of raw values a measurement of this kind carries.
    #[inline]
    pub const fn dimension(self) -> usize {
        match self {
            SensorKind::Linear => 2,
            SensorKind::Nonlinear => 3,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Linear => write!(f, "linear"),
            SensorKind::Nonlinear => write!(f, "nonlinear"),
        }
    }
}

/// Raw values of a measurement, shaped by sensor kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T: RealField> {
    /// `[px, py]`
    Linear(MeasurementVector<T, 2>),
    /// `[range, bearing, range_rate]`
    Nonlinear(MeasurementVector<T, 3>),
}

/// A single sensor observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement<T: RealField> {
    /// Acquisition time in microseconds
    pub timestamp_us: i64,
    /// Sensor values
    pub reading: Reading<T>,
}

impl<T: RealField + Float + Copy> Measurement<T> {
    /// Creates a position measurement.
    ///
    /// Values are not checked here; [`UnscentedKalmanFilter::process_measurement`](crate::filters::ukf::UnscentedKalmanFilter::process_measurement)
    /// rejects non-finite readings.
    pub fn linear(timestamp_us: i64, px: T, py: T) -> Self {
        Self {
            timestamp_us,
            reading: Reading::Linear(MeasurementVector::from_array([px, py])),
        }
    }

    /// Creates a range/bearing/range-rate measurement.
    ///
    /// Unchecked, like [`Measurement::linear`].
    pub fn nonlinear(timestamp_us: i64, range: T, bearing: T, range_rate: T) -> Self {
        Self {
            timestamp_us,
            reading: Reading::Nonlinear(MeasurementVector::from_array([
                range, bearing, range_rate,
            ])),
        }
    }

    /// Builds a measurement from an untyped value slice.
    ///
    /// # Errors
    /// - [`UkfError::MeasurementDimension`] if `values.len()` does not match `kind`
    /// - [`UkfError::NonFiniteMeasurement`] if any value is NaN or infinite
    pub fn from_raw(kind: SensorKind, values: &[T], timestamp_us: i64) -> Result<Self> {
        if values.len() != kind.dimension() {
            return Err(UkfError::MeasurementDimension {
                sensor: kind,
                expected: kind.dimension(),
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !Float::is_finite(*v)) {
            return Err(UkfError::NonFiniteMeasurement { sensor: kind });
        }

        Ok(match kind {
            SensorKind::Linear => Self::linear(timestamp_us, values[0], values[1]),
            SensorKind::Nonlinear => {
                Self::nonlinear(timestamp_us, values[0], values[1], values[2])
            }
        })
    }

    /// Sensor kind of this measurement.
    #[inline]
    pub fn kind(&self) -> SensorKind {
        match self.reading {
            Reading::Linear(_) => SensorKind::Linear,
            Reading::Nonlinear(_) => SensorKind::Nonlinear,
        }
    }

    /// Raw values in sensor order.
    #[inline]
    pub fn values(&self) -> &[T] {
        match &self.reading {
            Reading::Linear(z) => z.as_slice(),
            Reading::Nonlinear(z) => z.as_slice(),
        }
    }

    /// Cartesian position implied by the measurement.
    ///
    /// Polar readings are converted with `range * (cos, sin)(bearing)`.
    pub fn position(&self) -> (T, T) {
        match &self.reading {
            Reading::Linear(z) => (*z.index(0), *z.index(1)),
            Reading::Nonlinear(z) => {
                let range = *z.index(0);
                let bearing = *z.index(1);
                (range * Float::cos(bearing), range * Float::sin(bearing))
            }
        }
    }
}
