//! Sigma points and unscented weights
//!
//! The augmented state `x_aug` (dimension `n_aug = 7`) is represented by
//! `2 * n_aug + 1 = 15` deterministic points:
//!
//! - χ₀ = x_aug
//! - χᵢ = x_aug + √(λ + n_aug) · Lᵢ₋₁ for i = 1..=n_aug
//! - χᵢ₊ₙ = x_aug − √(λ + n_aug) · Lᵢ₋₁ for i = 1..=n_aug
//!
//! where `L` is the lower Cholesky factor of the augmented covariance and
//! λ = 3 − n_aug. With n_aug = 7 this gives λ = −4 and a negative centre weight;
//! the weights still sum to one.
//!
//! The same [`SigmaPoints`] container also holds the propagated points (in
//! state space) and their images in measurement space, so mean, covariance and
//! cross-covariance reconstruction are written once.

use nalgebra::{RealField, SMatrix, SVector};
use num_traits::Float;

use crate::types::angle::normalize_angle;
use crate::types::spaces::{AugmentedCovariance, AugmentedVector, N_AUG, N_SIGMA, N_X};

// ============================================================================
// Weights
// ============================================================================

/// Unscented weights shared by every mean and covariance reconstruction.
///
/// Computed once per filter; `w₀ = λ / (λ + n_aug)`, `wᵢ = 1 / (2(λ + n_aug))`.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaWeights<T: RealField> {
    weights: SVector<T, N_SIGMA>,
    lambda: T,
}

impl<T: RealField + Float + Copy> SigmaWeights<T> {
    /// Weights for the augmented CTRV state with λ = 3 − n_aug.
    pub fn new() -> Self {
        let n_aug: T = nalgebra::convert(N_AUG as f64);
        let lambda: T = nalgebra::convert(3.0 - N_AUG as f64);
        let half: T = nalgebra::convert(0.5);

        let mut weights = SVector::<T, N_SIGMA>::from_element(half / (lambda + n_aug));
        weights[0] = lambda / (lambda + n_aug);

        Self { weights, lambda }
    }

    /// Spreading parameter λ.
    #[inline]
    pub fn lambda(&self) -> T {
        self.lambda
    }

    /// Scale √(λ + n_aug) applied to the Cholesky columns.
    #[inline]
    pub fn spread(&self) -> T {
        let n_aug: T = nalgebra::convert(N_AUG as f64);
        Float::sqrt(self.lambda + n_aug)
    }

    /// Returns the weight of sigma point `i`.
    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.weights[i]
    }

    #[inline]
    pub fn as_svector(&self) -> &SVector<T, N_SIGMA> {
        &self.weights
    }
}

impl<T: RealField + Float + Copy> Default for SigmaWeights<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Sigma Points
// ============================================================================

/// A set of `N_SIGMA` points of dimension `D`, one per column.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaPoints<T: RealField, const D: usize> {
    points: SMatrix<T, D, N_SIGMA>,
}

/// Sigma points of the augmented state.
pub type AugmentedSigmaPoints<T> = SigmaPoints<T, N_AUG>;

/// Sigma points after propagation through the motion model.
pub type PredictedSigmaPoints<T> = SigmaPoints<T, N_X>;

impl<T: RealField + Float + Copy, const D: usize> SigmaPoints<T, D> {
    #[inline]
    pub fn from_matrix(points: SMatrix<T, D, N_SIGMA>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, D, N_SIGMA> {
        &self.points
    }

    /// Returns sigma point `i` as a column vector.
    #[inline]
    pub fn column(&self, i: usize) -> SVector<T, D> {
        self.points.column(i).into_owned()
    }

    /// Weighted mean Σ wᵢ χᵢ.
    pub fn mean(&self, weights: &SigmaWeights<T>) -> SVector<T, D> {
        self.points * weights.as_svector()
    }

    /// Difference `χᵢ − mean` with the angle component (if any) wrapped.
    #[inline]
    pub fn residual(&self, i: usize, mean: &SVector<T, D>, angle_index: Option<usize>) -> SVector<T, D> {
        let mut diff = self.column(i) - mean;
        if let Some(k) = angle_index {
            diff[k] = normalize_angle(diff[k]);
        }
        diff
    }

    /// Weighted covariance Σ wᵢ (χᵢ − mean)(χᵢ − mean)ᵀ.
    pub fn covariance(
        &self,
        weights: &SigmaWeights<T>,
        mean: &SVector<T, D>,
        angle_index: Option<usize>,
    ) -> SMatrix<T, D, D> {
        let mut cov = SMatrix::<T, D, D>::zeros();
        for i in 0..N_SIGMA {
            let diff = self.residual(i, mean, angle_index);
            cov += (diff * diff.transpose()).scale(weights.get(i));
        }
        cov
    }

    /// Weighted cross-covariance Σ wᵢ (χᵢ − mean)(ζᵢ − ζ̄)ᵀ between this set
    /// and its image `other`.
    pub fn cross_covariance<const E: usize>(
        &self,
        weights: &SigmaWeights<T>,
        mean: &SVector<T, D>,
        angle_index: Option<usize>,
        other: &SigmaPoints<T, E>,
        other_mean: &SVector<T, E>,
        other_angle_index: Option<usize>,
    ) -> SMatrix<T, D, E> {
        let mut cross = SMatrix::<T, D, E>::zeros();
        for i in 0..N_SIGMA {
            let diff = self.residual(i, mean, angle_index);
            let other_diff = other.residual(i, other_mean, other_angle_index);
            cross += (diff * other_diff.transpose()).scale(weights.get(i));
        }
        cross
    }
}

impl<T: RealField + Float + Copy> AugmentedSigmaPoints<T> {
    /// Generates the augmented sigma points.
    ///
    /// # Returns
    /// `None` if the covariance is not positive definite.
    pub fn generate(
        mean: &AugmentedVector<T>,
        covariance: &AugmentedCovariance<T>,
        weights: &SigmaWeights<T>,
    ) -> Option<Self> {
        let l = covariance.cholesky()?;
        let spread = weights.spread();
        let mu = mean.as_svector();

        let mut points = SMatrix::<T, N_AUG, N_SIGMA>::zeros();
        points.set_column(0, mu);
        for i in 0..N_AUG {
            let offset = l.column(i).scale(spread);
            points.set_column(i + 1, &(mu + &offset));
            points.set_column(i + 1 + N_AUG, &(mu - &offset));
        }

        Some(Self { points })
    }

    /// Returns augmented sigma point `i`.
    #[inline]
    pub fn point(&self, i: usize) -> AugmentedVector<T> {
        AugmentedVector::from_svector(self.column(i))
    }
}
