//! Filter consistency checks based on the Normalized Innovation Squared
//!
//! For a consistent filter the NIS of an `M`-dimensional measurement follows a
//! chi-square distribution with `M` degrees of freedom. About 5% of the values
//! should exceed the 95% quantile; a much larger share indicates the noise
//! parameters are too optimistic, a much smaller one that they are too
//! pessimistic.

use nalgebra::RealField;
use num_traits::Float;

use crate::filters::ukf::StepOutcome;
use crate::types::measurement::SensorKind;

/// 95% quantile of chi-square with 2 degrees of freedom.
pub const CHI_SQUARED_95_2DOF: f64 = 5.991;

/// 95% quantile of chi-square with 3 degrees of freedom.
pub const CHI_SQUARED_95_3DOF: f64 = 7.815;

/// 95% NIS bound for a sensor kind.
#[inline]
pub fn nis_bound_95(kind: SensorKind) -> f64 {
    match kind {
        SensorKind::Linear => CHI_SQUARED_95_2DOF,
        SensorKind::Nonlinear => CHI_SQUARED_95_3DOF,
    }
}

// ============================================================================
// NIS Monitor
// ============================================================================

/// Running NIS statistics for one sensor kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NisStats<T> {
    pub count: usize,
    pub above_bound: usize,
    pub sum: T,
}

impl<T: RealField + Float + Copy> NisStats<T> {
    fn new() -> Self {
        Self {
            count: 0,
            above_bound: 0,
            sum: T::zero(),
        }
    }

    /// Mean NIS; should approach the measurement dimension.
    pub fn mean(&self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / nalgebra::convert(self.count as f64))
    }

    /// Share of updates above the 95% bound.
    pub fn fraction_above(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.above_bound as f64 / self.count as f64)
    }
}

/// Collects NIS values per sensor kind across a run.
#[derive(Debug, Clone)]
pub struct NisMonitor<T> {
    linear: NisStats<T>,
    nonlinear: NisStats<T>,
}

impl<T: RealField + Float + Copy> NisMonitor<T> {
    pub fn new() -> Self {
        Self {
            linear: NisStats::new(),
            nonlinear: NisStats::new(),
        }
    }

    /// Records one NIS value.
    pub fn record(&mut self, kind: SensorKind, nis: T) {
        let bound: T = nalgebra::convert(nis_bound_95(kind));
        let stats = match kind {
            SensorKind::Linear => &mut self.linear,
            SensorKind::Nonlinear => &mut self.nonlinear,
        };
        stats.count += 1;
        stats.sum += nis;
        if nis > bound {
            stats.above_bound += 1;
        }
    }

    /// Records the NIS of an update; other outcomes are ignored.
    pub fn record_outcome(&mut self, outcome: &StepOutcome<T>) {
        if let StepOutcome::Updated { kind, nis } = *outcome {
            self.record(kind, nis);
        }
    }

    pub fn stats(&self, kind: SensorKind) -> &NisStats<T> {
        match kind {
            SensorKind::Linear => &self.linear,
            SensorKind::Nonlinear => &self.nonlinear,
        }
    }

    /// True if no more than `tolerance` of the updates exceeded the 95% bound.
    ///
    /// A kind without updates counts as consistent.
    pub fn is_consistent(&self, kind: SensorKind, tolerance: f64) -> bool {
        self.stats(kind)
            .fraction_above()
            .is_none_or(|fraction| fraction <= tolerance)
    }
}

impl<T: RealField + Float + Copy> Default for NisMonitor<T> {
    fn default() -> Self {
        Self::new()
    }
}
