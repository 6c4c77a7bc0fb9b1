//! Transition (motion) model for target dynamics
//!
//! Constant Turn Rate and Velocity (CTRV) with process noise entering through
//! the two augmented state components.

use nalgebra::RealField;
use num_traits::Float;

use crate::types::spaces::{AugmentedVector, StateVector};

/// Below this yaw rate the arc update is replaced by the straight-line update.
pub const YAW_RATE_EPSILON: f64 = 0.001;

/// Constant Turn Rate and Velocity model in 2D.
///
/// State: `[px, py, v, yaw, yaw_rate]`
/// Augmented: `[px, py, v, yaw, yaw_rate, nu_accel, nu_yaw_accel]`
#[derive(Debug, Clone)]
pub struct CtrvModel<T: RealField> {
    /// Longitudinal acceleration noise standard deviation
    pub std_accel: T,
    /// Yaw acceleration noise standard deviation
    pub std_yaw_accel: T,
}

impl<T: RealField + Float + Copy> CtrvModel<T> {
    /// Creates a new CTRV model.
    ///
    /// # Panics
    /// Panics if either standard deviation is not strictly positive.
    pub fn new(std_accel: T, std_yaw_accel: T) -> Self {
        assert!(
            std_accel > T::zero(),
            "Process noise std_accel must be positive"
        );
        assert!(
            std_yaw_accel > T::zero(),
            "Process noise std_yaw_accel must be positive"
        );
        Self {
            std_accel,
            std_yaw_accel,
        }
    }

    /// Variances of the two augmented noise components.
    #[inline]
    pub fn noise_variances(&self) -> (T, T) {
        (
            self.std_accel * self.std_accel,
            self.std_yaw_accel * self.std_yaw_accel,
        )
    }

    /// Propagates one augmented sigma point over `dt` seconds.
    ///
    /// The two noise components are consumed here; the result lives in the
    /// unaugmented state space.
    pub fn propagate(&self, point: &AugmentedVector<T>, dt: T) -> StateVector<T> {
        let px = *point.index(0);
        let py = *point.index(1);
        let v = *point.index(2);
        let yaw = *point.index(3);
        let yaw_rate = *point.index(4);
        let nu_accel = *point.index(5);
        let nu_yaw_accel = *point.index(6);

        let eps: T = nalgebra::convert(YAW_RATE_EPSILON);
        let half: T = nalgebra::convert(0.5);
        let (sin_yaw, cos_yaw) = (Float::sin(yaw), Float::cos(yaw));

        let (mut px_p, mut py_p) = if Float::abs(yaw_rate) > eps {
            let yaw_end = yaw + yaw_rate * dt;
            (
                px + v / yaw_rate * (Float::sin(yaw_end) - sin_yaw),
                py + v / yaw_rate * (cos_yaw - Float::cos(yaw_end)),
            )
        } else {
            (px + v * dt * cos_yaw, py + v * dt * sin_yaw)
        };

        let mut v_p = v;
        let mut yaw_p = yaw + yaw_rate * dt;
        let mut yaw_rate_p = yaw_rate;

        let dt2 = dt * dt;
        px_p += half * nu_accel * dt2 * cos_yaw;
        py_p += half * nu_accel * dt2 * sin_yaw;
        v_p += nu_accel * dt;
        yaw_p += half * nu_yaw_accel * dt2;
        yaw_rate_p += nu_yaw_accel * dt;

        StateVector::from_array([px_p, py_p, v_p, yaw_p, yaw_rate_p])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn augmented(values: [f64; 7]) -> AugmentedVector<f64> {
        AugmentedVector::from_array(values)
    }

    #[test]
    fn test_ctrv_straight_line_exact() {
        let model = CtrvModel::new(0.8_f64, 0.6);
        let (px, py, v, yaw) = (1.0, -2.0, 3.0, 0.7);
        let dt = 0.5;

        let predicted = model.propagate(&augmented([px, py, v, yaw, 0.0, 0.0, 0.0]), dt);

        assert_eq!(*predicted.index(0), px + v * dt * yaw.cos());
        assert_eq!(*predicted.index(1), py + v * dt * yaw.sin());
        assert_eq!(*predicted.index(2), v);
        assert_eq!(*predicted.index(3), yaw);
        assert_eq!(*predicted.index(4), 0.0);
    }

    #[test]
    fn test_ctrv_quarter_turn() {
        use std::f64::consts::FRAC_PI_2;

        let model = CtrvModel::new(0.8_f64, 0.6);
        // Moving east at 10 m/s, turning left at pi/2 rad/s for one second
        let predicted = model.propagate(&augmented([0.0, 0.0, 10.0, 0.0, FRAC_PI_2, 0.0, 0.0]), 1.0);

        let r = 10.0 / FRAC_PI_2;
        assert_abs_diff_eq!(*predicted.index(0), r, epsilon = 1e-10);
        assert_abs_diff_eq!(*predicted.index(1), r, epsilon = 1e-10);
        assert_abs_diff_eq!(*predicted.index(3), FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(*predicted.index(2), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ctrv_branches_agree_near_threshold() {
        let model = CtrvModel::new(0.8_f64, 0.6);
        let arc = model.propagate(&augmented([0.0, 0.0, 5.0, 0.3, 0.0011, 0.0, 0.0]), 0.1);
        let line = model.propagate(&augmented([0.0, 0.0, 5.0, 0.3, 0.0009, 0.0, 0.0]), 0.1);

        assert_abs_diff_eq!(*arc.index(0), *line.index(0), epsilon = 1e-4);
        assert_abs_diff_eq!(*arc.index(1), *line.index(1), epsilon = 1e-4);
    }

    #[test]
    fn test_ctrv_noise_injection() {
        let model = CtrvModel::new(0.8_f64, 0.6);
        let dt = 0.2;
        let quiet = model.propagate(&augmented([0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]), dt);
        let noisy = model.propagate(&augmented([0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 3.0]), dt);

        assert_abs_diff_eq!(noisy.index(0) - quiet.index(0), 0.5 * 2.0 * dt * dt, epsilon = 1e-12);
        assert_abs_diff_eq!(noisy.index(1) - quiet.index(1), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(noisy.index(2) - quiet.index(2), 2.0 * dt, epsilon = 1e-12);
        assert_abs_diff_eq!(noisy.index(3) - quiet.index(3), 0.5 * 3.0 * dt * dt, epsilon = 1e-12);
        assert_abs_diff_eq!(noisy.index(4) - quiet.index(4), 3.0 * dt, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_dt_is_identity() {
        let model = CtrvModel::new(0.8_f64, 0.6);
        let predicted = model.propagate(&augmented([1.0, 2.0, 3.0, 0.4, 0.5, 1.0, 1.0]), 0.0);
        assert_eq!(predicted.as_slice(), &[1.0, 2.0, 3.0, 0.4, 0.5]);
    }

    #[test]
    #[should_panic(expected = "std_accel must be positive")]
    fn test_rejects_zero_noise() {
        let _ = CtrvModel::new(0.0_f64, 0.6);
    }
}
