//! Heading and bearing angle wrap-around

use nalgebra::RealField;
use num_traits::Float;

/// Normalizes an angle into `(-π, π]`.
///
/// Angles already inside the interval are returned untouched, so repeated
/// normalization is exact.
pub fn normalize_angle<T: RealField + Float + Copy>(angle: T) -> T {
    let pi = T::pi();
    if angle > -pi && angle <= pi {
        return angle;
    }
    if !Float::is_finite(angle) {
        return angle;
    }

    let two_pi = T::two_pi();
    // (π - a) mod 2π lies in [0, 2π), so π minus it lies in (-π, π]
    let shifted = pi - angle;
    let wrapped = shifted - two_pi * Float::floor(shifted / two_pi);
    let mut result = pi - wrapped;

    // floor() rounding can land one period off at the interval edges
    if result <= -pi {
        result += two_pi;
    } else if result > pi {
        result -= two_pi;
    }
    result
}
