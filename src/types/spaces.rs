//! Vector space markers and typed vectors
//!
//! The filter juggles four kinds of vectors of different dimension: the 5-D
//! state, the 7-D augmented state, 2-D/3-D measurements, and innovations. Each
//! is tagged with a space marker so they cannot be accidentally combined.

use ::core::marker::PhantomData;
use nalgebra::{RealField, SMatrix, SVector, Scalar};

// ============================================================================
// Dimensions
// ============================================================================

/// State dimension: `[px, py, v, yaw, yaw_rate]`
pub const N_X: usize = 5;

/// Augmented dimension: state plus longitudinal and yaw acceleration noise
pub const N_AUG: usize = 7;

/// Number of sigma points generated from the augmented state
pub const N_SIGMA: usize = 2 * N_AUG + 1;

/// Index of the heading angle inside the state vector
pub const YAW_INDEX: usize = 3;

// ============================================================================
// Vector Space Markers
// ============================================================================

/// Marker type for state space vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSpace;

/// Marker type for the noise-augmented state space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AugmentedSpace;

/// Marker type for measurement space vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementSpace;

/// Marker type for innovation vectors (measurement - predicted measurement)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnovationSpace;

// ============================================================================
// Typed Vector
// ============================================================================

/// A vector parameterized by scalar type, dimension, and mathematical space.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<T: Scalar, const N: usize, Space> {
    inner: SVector<T, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Vector<T, N, Space> {
    /// Creates a new vector from raw components.
    #[inline]
    pub fn from_array(data: [T; N]) -> Self {
        Self {
            inner: SVector::from(data),
            _marker: PhantomData,
        }
    }

    /// Creates a new vector from an nalgebra SVector.
    #[inline]
    pub fn from_svector(inner: SVector<T, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying nalgebra vector.
    #[inline]
    pub fn as_svector(&self) -> &SVector<T, N> {
        &self.inner
    }

    /// Consumes self and returns the underlying nalgebra vector.
    #[inline]
    pub fn into_svector(self) -> SVector<T, N> {
        self.inner
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    /// Access element at index.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn index(&self, index: usize) -> &T {
        &self.inner[index]
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Vector<T, N, Space> {}

// ============================================================================
// Type Aliases
// ============================================================================

/// A state vector `[px, py, v, yaw, yaw_rate]`.
pub type StateVector<T> = Vector<T, N_X, StateSpace>;

/// A state vector extended with the two process-noise variables.
pub type AugmentedVector<T> = Vector<T, N_AUG, AugmentedSpace>;

/// A measurement vector in measurement space.
pub type MeasurementVector<T, const M: usize> = Vector<T, M, MeasurementSpace>;

/// An innovation vector (measurement residual) in innovation space.
pub type Innovation<T, const M: usize> = Vector<T, M, InnovationSpace>;

impl<T: RealField + Copy> StateVector<T> {
    /// Embeds the state into the augmented space with zero-mean noise terms.
    #[inline]
    pub fn augment(&self) -> AugmentedVector<T> {
        let mut inner = SVector::<T, N_AUG>::zeros();
        inner.fixed_rows_mut::<N_X>(0).copy_from(&self.inner);
        AugmentedVector::from_svector(inner)
    }
}

// ============================================================================
// Measurement - Measurement = Innovation
// ============================================================================

/// Trait for computing innovation (residual) from measurements.
///
/// Subtracting two measurements produces an innovation vector, not another
/// measurement, hence the separate trait.
pub trait ComputeInnovation<T: RealField, const M: usize> {
    /// Computes the innovation between this measurement and a predicted measurement.
    fn innovation(self, predicted: MeasurementVector<T, M>) -> Innovation<T, M>;
}

impl<T: RealField + Copy, const M: usize> ComputeInnovation<T, M> for MeasurementVector<T, M> {
    #[inline]
    fn innovation(self, predicted: MeasurementVector<T, M>) -> Innovation<T, M> {
        Innovation::from_svector(self.inner - predicted.inner)
    }
}

// ============================================================================
// Covariance Matrix
// ============================================================================

/// A covariance matrix bound to a specific vector space.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance<T: Scalar, const N: usize, Space> {
    inner: SMatrix<T, N, N>,
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Covariance<T, N, Space> {
    /// Creates a covariance matrix from a raw matrix.
    ///
    /// The caller should ensure the matrix is symmetric and positive semi-definite.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, N, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Returns a reference to the underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, N, N> {
        &self.inner
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Covariance<T, N, Space> where
    SMatrix<T, N, N>: Copy
{
}

impl<T: RealField + Copy, const N: usize, Space> Covariance<T, N, Space> {
    /// Creates an identity covariance matrix.
    #[inline]
    pub fn identity() -> Self {
        Self::from_matrix(SMatrix::identity())
    }

    /// Creates a diagonal covariance matrix.
    #[inline]
    pub fn from_diagonal(diag: &SVector<T, N>) -> Self {
        Self::from_matrix(SMatrix::from_diagonal(diag))
    }

    /// Computes the trace of the covariance matrix.
    #[inline]
    pub fn trace(&self) -> T {
        self.inner.trace()
    }

    /// Computes the lower-triangular Cholesky factor `L` with `P = L * Lᵀ`.
    ///
    /// Returns `None` if the matrix is not positive definite.
    #[inline]
    pub fn cholesky(&self) -> Option<SMatrix<T, N, N>> {
        nalgebra::Cholesky::new(self.inner).map(|c| c.l())
    }

    /// Returns true if the matrix equals its transpose within `tolerance`.
    pub fn is_symmetric(&self, tolerance: T) -> bool {
        for i in 0..N {
            for j in (i + 1)..N {
                let diff = self.inner[(i, j)] - self.inner[(j, i)];
                if diff.abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }
}

/// Covariance matrix in state space.
pub type StateCovariance<T> = Covariance<T, N_X, StateSpace>;

/// Covariance matrix in the augmented space.
pub type AugmentedCovariance<T> = Covariance<T, N_AUG, AugmentedSpace>;

/// Covariance matrix in measurement space.
pub type MeasurementCovariance<T, const M: usize> = Covariance<T, M, MeasurementSpace>;

impl<T: RealField + Copy> StateCovariance<T> {
    /// Embeds the state covariance top-left and the two process-noise
    /// variances on the bottom-right diagonal.
    pub fn augment(&self, var_accel: T, var_yaw_accel: T) -> AugmentedCovariance<T> {
        let mut inner = SMatrix::<T, N_AUG, N_AUG>::zeros();
        inner
            .fixed_view_mut::<N_X, N_X>(0, 0)
            .copy_from(&self.inner);
        inner[(N_X, N_X)] = var_accel;
        inner[(N_X + 1, N_X + 1)] = var_yaw_accel;
        AugmentedCovariance::from_matrix(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_to_innovation() {
        let actual: MeasurementVector<f64, 2> = MeasurementVector::from_array([10.0, 20.0]);
        let predicted: MeasurementVector<f64, 2> = MeasurementVector::from_array([9.5, 19.0]);

        let innovation = actual.innovation(predicted);
        assert!((innovation.index(0) - 0.5).abs() < 1e-10);
        assert!((innovation.index(1) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_state_augmentation_zero_noise_mean() {
        let x: StateVector<f64> = StateVector::from_array([1.0, 2.0, 3.0, 0.5, 0.1]);
        let x_aug = x.augment();

        assert_eq!(&x_aug.as_slice()[..N_X], x.as_slice());
        assert_eq!(*x_aug.index(5), 0.0);
        assert_eq!(*x_aug.index(6), 0.0);
    }

    #[test]
    fn test_covariance_augmentation_layout() {
        let p: StateCovariance<f64> = StateCovariance::from_diagonal(&nalgebra::vector![
            1.0, 2.0, 3.0, 4.0, 5.0
        ]);
        let p_aug = p.augment(0.64, 0.36);
        let m = p_aug.as_matrix();

        for i in 0..N_X {
            assert_eq!(m[(i, i)], (i + 1) as f64);
        }
        assert_eq!(m[(5, 5)], 0.64);
        assert_eq!(m[(6, 6)], 0.36);
        assert_eq!(m[(5, 6)], 0.0);
        assert_eq!(m[(0, 5)], 0.0);
        assert!(p_aug.is_symmetric(0.0));
    }

    #[test]
    fn test_non_positive_definite_has_no_cholesky() {
        let singular: Covariance<f64, 2, StateSpace> =
            Covariance::from_matrix(nalgebra::matrix![1.0, 2.0; 2.0, 1.0]);
        assert!(singular.cholesky().is_none());
    }
}
