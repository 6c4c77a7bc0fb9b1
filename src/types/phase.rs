// ============================================================================
// Filter Lifecycle
// ============================================================================

/// Lifecycle phase of a filter instance.
///
/// The only transition is `Uninitialized -> Tracking`, taken on the first
/// measurement and never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPhase {
    /// No measurement consumed yet
    #[default]
    Uninitialized,
    /// Seeded from a measurement; `clock_us` is the time of the last processed one
    Tracking { clock_us: i64 },
}

impl FilterPhase {
    /// Returns true once the first measurement has been consumed.
    #[inline]
    pub fn is_tracking(&self) -> bool {
        matches!(self, FilterPhase::Tracking { .. })
    }

    /// Internal clock, if tracking.
    #[inline]
    pub fn clock_us(&self) -> Option<i64> {
        match self {
            FilterPhase::Uninitialized => None,
            FilterPhase::Tracking { clock_us } => Some(*clock_us),
        }
    }
}
