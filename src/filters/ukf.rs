//! Unscented Kalman Filter (UKF) for CTRV tracking with two sensor kinds
//!
//! The filter owns the current estimate and runs one predict/correct cycle per
//! incoming [`Measurement`]:
//!
//! 1. The first measurement seeds position and the internal clock.
//! 2. Every later measurement advances the state by the elapsed time, split
//!    into 0.05 s sub-steps when the gap exceeds 0.1 s.
//! 3. The predicted sigma points are mapped into the sensor's measurement
//!    space and the correction is applied.
//!
//! # Example
//!
//! ```
//! use ctrv_ukf::filters::ukf::{StepOutcome, UnscentedKalmanFilter};
//! use ctrv_ukf::types::measurement::Measurement;
//! use ctrv_ukf::UkfConfig;
//!
//! let mut filter = UnscentedKalmanFilter::<f64>::new(UkfConfig::default()).unwrap();
//!
//! filter.process_measurement(&Measurement::linear(0, 1.0, 2.0)).unwrap();
//! let outcome = filter
//!     .process_measurement(&Measurement::nonlinear(100_000, 2.3, 1.1, 0.2))
//!     .unwrap();
//!
//! assert!(matches!(outcome, StepOutcome::Updated { .. }));
//! let mean = filter.mean();
//! println!("px = {}, py = {}", mean.index(0), mean.index(1));
//! ```

use nalgebra::{RealField, SMatrix};
use num_traits::Float;
use tracing::{debug, trace, warn};

use super::sigma::{AugmentedSigmaPoints, PredictedSigmaPoints, SigmaPoints, SigmaWeights};
use crate::config::UkfConfig;
use crate::models::{CtrvModel, MeasurementModel, PositionSensor, RangeBearingSensor};
use crate::types::angle::normalize_angle;
use crate::types::measurement::{Measurement, Reading, SensorKind};
use crate::types::phase::FilterPhase;
use crate::types::spaces::{
    ComputeInnovation, MeasurementVector, StateCovariance, StateVector, N_SIGMA, N_X, YAW_INDEX,
};
use crate::{Result, UkfError};

/// Gaps longer than this are integrated in sub-steps.
pub const MAX_PREDICTION_STEP: f64 = 0.1;

/// Length of each prediction sub-step.
pub const PREDICTION_SUB_STEP: f64 = 0.05;

/// Placeholder state used until a measurement seeds position.
///
/// Velocity, heading and yaw rate are non-zero on purpose.
pub const INITIAL_STATE: [f64; N_X] = [0.1, 0.1, 0.1, 0.1, 0.01];

// ============================================================================
// Filter State
// ============================================================================

/// State estimate of the filter: mean and covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct UkfState<T: RealField> {
    /// `[px, py, v, yaw, yaw_rate]`
    pub mean: StateVector<T>,
    /// 5×5 covariance
    pub covariance: StateCovariance<T>,
}

impl<T: RealField + Float + Copy> UkfState<T> {
    #[inline]
    pub fn new(mean: StateVector<T>, covariance: StateCovariance<T>) -> Self {
        Self { mean, covariance }
    }

    /// `(px, py)`
    #[inline]
    pub fn position(&self) -> (T, T) {
        (*self.mean.index(0), *self.mean.index(1))
    }

    /// Velocity components `(v·cos yaw, v·sin yaw)`.
    pub fn velocity(&self) -> (T, T) {
        let v = *self.mean.index(2);
        let yaw = *self.mean.index(YAW_INDEX);
        (v * Float::cos(yaw), v * Float::sin(yaw))
    }

    fn placeholder() -> Self {
        Self::new(
            StateVector::from_array(INITIAL_STATE.map(nalgebra::convert)),
            StateCovariance::identity(),
        )
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why a measurement did not produce a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The sensor kind is switched off in the configuration
    SensorDisabled,
    /// A predicted sigma point sat exactly on the sensor origin
    DegenerateGeometry { sigma_index: usize },
}

/// Result of feeding one measurement to the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome<T> {
    /// First measurement consumed; `seeded` is false when its sensor is disabled
    /// and the placeholder position was kept.
    Initialized { kind: SensorKind, seeded: bool },
    /// Prediction and correction applied
    Updated { kind: SensorKind, nis: T },
    /// Prediction applied, correction skipped
    Skipped { kind: SensorKind, reason: SkipReason },
}

impl<T> StepOutcome<T> {
    /// Sensor kind of the measurement that produced this outcome.
    pub fn kind(&self) -> SensorKind {
        match self {
            StepOutcome::Initialized { kind, .. }
            | StepOutcome::Updated { kind, .. }
            | StepOutcome::Skipped { kind, .. } => *kind,
        }
    }

    /// Returns true if a correction was applied.
    pub fn is_update(&self) -> bool {
        matches!(self, StepOutcome::Updated { .. })
    }
}

// ============================================================================
// Unscented Kalman Filter
// ============================================================================

#[derive(Debug, Clone)]
struct SensorSuite<T: RealField> {
    linear: PositionSensor<T>,
    nonlinear: RangeBearingSensor<T>,
}

impl<T: RealField + Float + Copy> SensorSuite<T> {
    fn from_config(config: &UkfConfig) -> Self {
        Self {
            linear: PositionSensor::new(
                nalgebra::convert(config.std_pos1),
                nalgebra::convert(config.std_pos2),
            ),
            nonlinear: RangeBearingSensor::new(
                nalgebra::convert(config.std_range),
                nalgebra::convert(config.std_bearing),
                nalgebra::convert(config.std_range_rate),
            ),
        }
    }
}

/// Unscented Kalman Filter over the CTRV state `[px, py, v, yaw, yaw_rate]`.
///
/// One instance tracks one object. It is not shared between threads while
/// processing; independent objects get independent instances.
#[derive(Debug, Clone)]
pub struct UnscentedKalmanFilter<T: RealField> {
    config: UkfConfig,
    process: CtrvModel<T>,
    weights: SigmaWeights<T>,
    state: UkfState<T>,
    phase: FilterPhase,
    /// Measurement noise, materialized on initialization
    sensors: Option<SensorSuite<T>>,
    /// Output of the last prediction, consumed by the next update
    predicted: Option<PredictedSigmaPoints<T>>,
    nis_linear: Option<T>,
    nis_nonlinear: Option<T>,
}

impl<T: RealField + Float + Copy> UnscentedKalmanFilter<T> {
    /// Creates an uninitialized filter.
    ///
    /// # Errors
    /// [`UkfError::InvalidConfig`] if a standard deviation is not finite and positive.
    pub fn new(config: UkfConfig) -> Result<Self> {
        config.validate()?;
        let process = CtrvModel::new(
            nalgebra::convert(config.std_accel),
            nalgebra::convert(config.std_yaw_accel),
        );

        Ok(Self {
            config,
            process,
            weights: SigmaWeights::new(),
            state: UkfState::placeholder(),
            phase: FilterPhase::Uninitialized,
            sensors: None,
            predicted: None,
            nis_linear: None,
            nis_nonlinear: None,
        })
    }

    /// Creates a filter that is already tracking from a known estimate.
    ///
    /// Useful when a track is handed over from another estimator.
    pub fn from_state(config: UkfConfig, state: UkfState<T>, timestamp_us: i64) -> Result<Self> {
        let mut filter = Self::new(config)?;
        filter.state = state;
        filter.sensors = Some(SensorSuite::from_config(&filter.config));
        filter.phase = FilterPhase::Tracking {
            clock_us: timestamp_us,
        };
        Ok(filter)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[inline]
    pub fn config(&self) -> &UkfConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &UkfState<T> {
        &self.state
    }

    #[inline]
    pub fn mean(&self) -> &StateVector<T> {
        &self.state.mean
    }

    #[inline]
    pub fn covariance(&self) -> &StateCovariance<T> {
        &self.state.covariance
    }

    #[inline]
    pub fn weights(&self) -> &SigmaWeights<T> {
        &self.weights
    }

    #[inline]
    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.phase.is_tracking()
    }

    /// Time of the last processed measurement.
    #[inline]
    pub fn timestamp_us(&self) -> Option<i64> {
        self.phase.clock_us()
    }

    /// Sigma points from the last prediction not yet consumed by an update.
    #[inline]
    pub fn predicted_sigma_points(&self) -> Option<&PredictedSigmaPoints<T>> {
        self.predicted.as_ref()
    }

    /// Normalized innovation squared of the last update of the given kind.
    #[inline]
    pub fn nis(&self, kind: SensorKind) -> Option<T> {
        match kind {
            SensorKind::Linear => self.nis_linear,
            SensorKind::Nonlinear => self.nis_nonlinear,
        }
    }

    /// Whether corrections from `kind` are applied.
    #[inline]
    pub fn sensor_enabled(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Linear => self.config.use_linear_sensor,
            SensorKind::Nonlinear => self.config.use_nonlinear_sensor,
        }
    }

    // ------------------------------------------------------------------------
    // Measurement processing
    // ------------------------------------------------------------------------

    /// Runs one full cycle for a measurement.
    ///
    /// # Errors
    /// - [`UkfError::NonFiniteMeasurement`] if a reading is NaN or infinite
    /// - [`UkfError::OutOfOrderMeasurement`] if the timestamp precedes the clock
    /// - [`UkfError::NotPositiveDefinite`] if prediction diverged
    ///
    /// A failed prediction leaves the filter as it was before the call. A failed
    /// correction keeps the prediction and the new clock.
    /// - [`UkfError::SingularInnovation`] if S cannot be inverted
    ///
    /// Degenerate geometry is not an error: it yields [`StepOutcome::Skipped`].
    pub fn process_measurement(&mut self, measurement: &Measurement<T>) -> Result<StepOutcome<T>> {
        let kind = measurement.kind();
        if measurement.values().iter().any(|v| !Float::is_finite(*v)) {
            return Err(UkfError::NonFiniteMeasurement { sensor: kind });
        }

        let clock_us = match self.phase {
            FilterPhase::Uninitialized => {
                let seeded = self.initialize(measurement);
                return Ok(StepOutcome::Initialized { kind, seeded });
            }
            FilterPhase::Tracking { clock_us } => clock_us,
        };

        if measurement.timestamp_us < clock_us {
            return Err(UkfError::OutOfOrderMeasurement {
                timestamp_us: measurement.timestamp_us,
                clock_us,
            });
        }

        let dt: T = nalgebra::convert((measurement.timestamp_us - clock_us) as f64 / 1e6);
        self.predict(dt)?;
        self.phase = FilterPhase::Tracking {
            clock_us: measurement.timestamp_us,
        };

        if !self.sensor_enabled(kind) {
            trace!(%kind, "sensor disabled, correction skipped");
            return Ok(StepOutcome::Skipped {
                kind,
                reason: SkipReason::SensorDisabled,
            });
        }

        let result = match &measurement.reading {
            Reading::Linear(z) => self.update_linear(z),
            Reading::Nonlinear(z) => self.update_nonlinear(z),
        };

        match result {
            Ok(nis) => Ok(StepOutcome::Updated { kind, nis }),
            Err(UkfError::DegenerateGeometry { sigma_index }) => {
                warn!(
                    %kind,
                    sigma_index,
                    timestamp_us = measurement.timestamp_us,
                    "sigma point at sensor origin, correction skipped"
                );
                Ok(StepOutcome::Skipped {
                    kind,
                    reason: SkipReason::DegenerateGeometry { sigma_index },
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Seeds the filter from its first measurement.
    ///
    /// Returns true if the position was taken from the measurement.
    fn initialize(&mut self, measurement: &Measurement<T>) -> bool {
        let kind = measurement.kind();
        let seeded = self.sensor_enabled(kind);

        if seeded {
            let (px, py) = measurement.position();
            let mut mean = UkfState::<T>::placeholder().mean.into_svector();
            mean[0] = px;
            mean[1] = py;
            self.state.mean = StateVector::from_svector(mean);
        }

        self.sensors = Some(SensorSuite::from_config(&self.config));
        self.phase = FilterPhase::Tracking {
            clock_us: measurement.timestamp_us,
        };

        debug!(
            %kind,
            seeded,
            timestamp_us = measurement.timestamp_us,
            mean = ?self.state.mean.as_slice(),
            "filter initialized"
        );
        seeded
    }

    // ------------------------------------------------------------------------
    // Prediction
    // ------------------------------------------------------------------------

    /// Advances the estimate by `dt` seconds.
    ///
    /// Gaps above 0.1 s are integrated as repeated 0.05 s steps followed by
    /// one step for the remainder. The predicted sigma points of the final
    /// step are kept for the next update.
    ///
    /// The estimate is replaced only once every sub-step succeeded.
    ///
    /// # Errors
    /// - [`UkfError::NegativeTimeStep`] if `dt` is negative or NaN
    /// - [`UkfError::NotPositiveDefinite`] with the failing sub-step index
    pub fn predict(&mut self, dt: T) -> Result<()> {
        if !(dt >= T::zero()) {
            return Err(UkfError::NegativeTimeStep);
        }

        let max_step: T = nalgebra::convert(MAX_PREDICTION_STEP);
        let sub_step: T = nalgebra::convert(PREDICTION_SUB_STEP);

        let mut remaining = dt;
        let mut index = 0;
        let mut state = self.state.clone();
        while remaining > max_step {
            state = self.predict_step(&state, sub_step, index)?.0;
            remaining -= sub_step;
            index += 1;
        }
        let (state, predicted) = self.predict_step(&state, remaining, index)?;

        self.state = state;
        self.predicted = Some(predicted);
        Ok(())
    }

    fn predict_step(
        &self,
        state: &UkfState<T>,
        dt: T,
        sub_step: usize,
    ) -> Result<(UkfState<T>, PredictedSigmaPoints<T>)> {
        let (var_accel, var_yaw_accel) = self.process.noise_variances();
        let x_aug = state.mean.augment();
        let p_aug = state.covariance.augment(var_accel, var_yaw_accel);

        let sigma = AugmentedSigmaPoints::generate(&x_aug, &p_aug, &self.weights)
            .ok_or(UkfError::NotPositiveDefinite { sub_step })?;

        let mut propagated = SMatrix::<T, N_X, N_SIGMA>::zeros();
        for i in 0..N_SIGMA {
            let point = self.process.propagate(&sigma.point(i), dt);
            propagated.set_column(i, point.as_svector());
        }
        let propagated = PredictedSigmaPoints::from_matrix(propagated);

        let mean = propagated.mean(&self.weights);
        let covariance = propagated.covariance(&self.weights, &mean, Some(YAW_INDEX));

        trace!(
            sub_step,
            dt = ?dt,
            mean = ?mean.as_slice(),
            "prediction step"
        );
        Ok((
            UkfState::new(
                StateVector::from_svector(mean),
                StateCovariance::from_matrix(covariance),
            ),
            propagated,
        ))
    }

    // ------------------------------------------------------------------------
    // Correction
    // ------------------------------------------------------------------------

    /// Corrects the predicted state with a position measurement `[px, py]`.
    ///
    /// Returns the NIS of the update.
    pub fn update_linear(&mut self, z: &MeasurementVector<T, 2>) -> Result<T> {
        let sensor = self.sensors()?.linear.clone();
        self.update(&sensor, z)
    }

    /// Corrects the predicted state with `[range, bearing, range_rate]`.
    ///
    /// Returns the NIS of the update. If any predicted sigma point sits at the
    /// origin the state is left at its prediction and
    /// [`UkfError::DegenerateGeometry`] is returned.
    pub fn update_nonlinear(&mut self, z: &MeasurementVector<T, 3>) -> Result<T> {
        let sensor = self.sensors()?.nonlinear.clone();
        self.update(&sensor, z)
    }

    fn sensors(&self) -> Result<&SensorSuite<T>> {
        self.sensors.as_ref().ok_or(UkfError::NotInitialized)
    }

    fn update<const M: usize, S>(&mut self, sensor: &S, z: &MeasurementVector<T, M>) -> Result<T>
    where
        S: MeasurementModel<T, M>,
    {
        let predicted = self.predicted.take().ok_or(UkfError::MissingPrediction)?;
        let (state, nis) = unscented_update(&self.state, &predicted, &self.weights, sensor, z)?;

        self.state = state;
        match sensor.kind() {
            SensorKind::Linear => self.nis_linear = Some(nis),
            SensorKind::Nonlinear => self.nis_nonlinear = Some(nis),
        }

        debug!(
            kind = %sensor.kind(),
            nis = ?nis,
            mean = ?self.state.mean.as_slice(),
            "measurement update"
        );
        Ok(nis)
    }
}

/// Unscented correction shared by every sensor.
///
/// Maps the predicted sigma points through `sensor`, builds the innovation
/// covariance S and cross-covariance Tc, and applies `K = Tc·S⁻¹`.
/// Returns the corrected state and the NIS.
pub fn unscented_update<T, S, const M: usize>(
    state: &UkfState<T>,
    predicted: &PredictedSigmaPoints<T>,
    weights: &SigmaWeights<T>,
    sensor: &S,
    z: &MeasurementVector<T, M>,
) -> Result<(UkfState<T>, T)>
where
    T: RealField + Float + Copy,
    S: MeasurementModel<T, M>,
{
    let mut mapped = SMatrix::<T, M, N_SIGMA>::zeros();
    for i in 0..N_SIGMA {
        let point = StateVector::from_svector(predicted.column(i));
        let z_i = sensor
            .observe(&point)
            .ok_or(UkfError::DegenerateGeometry { sigma_index: i })?;
        mapped.set_column(i, z_i.as_svector());
    }
    let mapped = SigmaPoints::from_matrix(mapped);
    let angle_index = sensor.angle_index();

    let z_pred = mapped.mean(weights);
    let s = mapped.covariance(weights, &z_pred, angle_index) + sensor.measurement_noise().as_matrix();

    let x_mean = state.mean.as_svector();
    let tc = predicted.cross_covariance(
        weights,
        x_mean,
        Some(YAW_INDEX),
        &mapped,
        &z_pred,
        angle_index,
    );

    let s_inv = s
        .try_inverse()
        .ok_or(UkfError::SingularInnovation {
            sensor: sensor.kind(),
        })?;
    let gain = tc * s_inv;

    let mut innovation = (*z)
        .innovation(MeasurementVector::from_svector(z_pred))
        .into_svector();
    if let Some(k) = angle_index {
        innovation[k] = normalize_angle(innovation[k]);
    }

    let mean = x_mean + gain * innovation;
    let covariance = state.covariance.as_matrix() - gain * s * gain.transpose();
    let nis = (innovation.transpose() * s_inv * innovation)[(0, 0)];

    Ok((
        UkfState::new(
            StateVector::from_svector(mean),
            StateCovariance::from_matrix(covariance),
        ),
        nis,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tracking_filter(mean: [f64; 5], p_diag: [f64; 5]) -> UnscentedKalmanFilter<f64> {
        let state = UkfState::new(
            StateVector::from_array(mean),
            StateCovariance::from_diagonal(&nalgebra::SVector::from(p_diag)),
        );
        UnscentedKalmanFilter::from_state(UkfConfig::default(), state, 0).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = UkfConfig {
            std_range: -1.0,
            ..UkfConfig::default()
        };
        let err = UnscentedKalmanFilter::<f64>::new(config).unwrap_err();
        assert!(matches!(err, UkfError::InvalidConfig(_)));
    }

    #[test]
    fn test_initialize_from_linear() {
        let mut filter = UnscentedKalmanFilter::<f64>::new(UkfConfig::default()).unwrap();
        assert!(!filter.is_initialized());

        let outcome = filter.process_measurement(&Measurement::linear(7, 1.0, 2.0)).unwrap();

        assert_eq!(
            outcome,
            StepOutcome::Initialized {
                kind: SensorKind::Linear,
                seeded: true
            }
        );
        assert_eq!(filter.mean().as_slice(), &[1.0, 2.0, 0.1, 0.1, 0.01]);
        assert_eq!(filter.timestamp_us(), Some(7));
        assert_eq!(filter.covariance(), &StateCovariance::identity());
        assert!(filter.predicted_sigma_points().is_none());
    }

    #[test]
    fn test_initialize_from_nonlinear_converts_polar() {
        let mut filter = UnscentedKalmanFilter::<f64>::new(UkfConfig::default()).unwrap();
        let bearing = 4.0_f64.atan2(3.0);
        filter
            .process_measurement(&Measurement::nonlinear(0, 5.0, bearing, 1.0))
            .unwrap();

        assert_abs_diff_eq!(*filter.mean().index(0), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(*filter.mean().index(1), 4.0, epsilon = 1e-12);
        assert_eq!(*filter.mean().index(2), 0.1);
        assert_eq!(*filter.mean().index(4), 0.01);
    }

    #[test]
    fn test_initialize_with_disabled_sensor_keeps_placeholder() {
        let config = UkfConfig::default().with_linear_sensor(false);
        let mut filter = UnscentedKalmanFilter::<f64>::new(config).unwrap();

        let outcome = filter.process_measurement(&Measurement::linear(0, 9.0, 9.0)).unwrap();

        assert_eq!(
            outcome,
            StepOutcome::Initialized {
                kind: SensorKind::Linear,
                seeded: false
            }
        );
        assert!(filter.is_initialized());
        assert_eq!(filter.mean().as_slice(), &INITIAL_STATE);
    }

    #[test]
    fn test_predict_zero_dt_is_identity() {
        let mut filter = tracking_filter([1.0, 2.0, 3.0, 0.4, 0.2], [1.0, 1.0, 1.0, 1.0, 1.0]);
        let before = filter.state().clone();

        filter.predict(0.0).unwrap();

        for i in 0..N_X {
            assert_abs_diff_eq!(*filter.mean().index(i), *before.mean.index(i), epsilon = 1e-12);
            for j in 0..N_X {
                assert_abs_diff_eq!(
                    filter.covariance().as_matrix()[(i, j)],
                    before.covariance.as_matrix()[(i, j)],
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_predict_keeps_covariance_symmetric() {
        let mut filter = tracking_filter([1.0, 2.0, 3.0, 0.4, 0.2], [0.5, 0.5, 1.0, 0.3, 0.1]);
        filter.predict(0.35).unwrap();

        assert!(filter.covariance().is_symmetric(1e-12));
        assert!(filter.covariance().cholesky().is_some());
        assert!(filter.predicted_sigma_points().is_some());
    }

    #[test]
    fn test_sub_stepping_matches_two_steps() {
        let mean = [2.0, -1.0, 4.0, 0.6, 0.3];
        let p = [1e-4; 5];
        let config = UkfConfig::default().with_process_noise(1e-3, 1e-3);
        let state = UkfState::new(
            StateVector::from_array(mean),
            StateCovariance::from_diagonal(&nalgebra::SVector::from(p)),
        );

        let mut once = UnscentedKalmanFilter::from_state(config.clone(), state.clone(), 0).unwrap();
        let mut twice = UnscentedKalmanFilter::from_state(config, state, 0).unwrap();

        once.predict(0.2).unwrap();
        twice.predict(0.1).unwrap();
        twice.predict(0.1).unwrap();

        for i in 0..N_X {
            assert_abs_diff_eq!(*once.mean().index(i), *twice.mean().index(i), epsilon = 1e-3);
            for j in 0..N_X {
                assert_abs_diff_eq!(
                    once.covariance().as_matrix()[(i, j)],
                    twice.covariance().as_matrix()[(i, j)],
                    epsilon = 1e-5
                );
            }
        }
    }

    #[test]
    fn test_predict_rejects_negative_dt() {
        let mut filter = tracking_filter([1.0, 2.0, 3.0, 0.4, 0.2], [1.0; 5]);
        assert_eq!(filter.predict(-0.1), Err(UkfError::NegativeTimeStep));
        assert_eq!(filter.predict(f64::NAN), Err(UkfError::NegativeTimeStep));
    }

    #[test]
    fn test_predict_reports_failing_sub_step() {
        let state = UkfState::new(
            StateVector::from_array([1.0, 2.0, 3.0, 0.4, 0.2]),
            StateCovariance::from_diagonal(&nalgebra::vector![1.0, 1.0, -1.0, 1.0, 1.0]),
        );
        let mut filter = UnscentedKalmanFilter::from_state(UkfConfig::default(), state, 0).unwrap();

        let before = filter.state().clone();

        assert_eq!(
            filter.predict(0.5),
            Err(UkfError::NotPositiveDefinite { sub_step: 0 })
        );
        assert_eq!(filter.state(), &before);
        assert!(filter.predicted_sigma_points().is_none());
    }

    #[test]
    fn test_update_requires_prediction() {
        let mut filter = tracking_filter([1.0, 2.0, 3.0, 0.4, 0.2], [1.0; 5]);
        let z = MeasurementVector::from_array([1.0, 2.0]);

        assert_eq!(filter.update_linear(&z), Err(UkfError::MissingPrediction));

        filter.predict(0.05).unwrap();
        assert!(filter.update_linear(&z).is_ok());
        assert_eq!(filter.update_linear(&z), Err(UkfError::MissingPrediction));
    }

    #[test]
    fn test_update_before_initialization_fails() {
        let mut filter = UnscentedKalmanFilter::<f64>::new(UkfConfig::default()).unwrap();
        filter.predict(0.05).unwrap();

        let z = MeasurementVector::from_array([1.0, 2.0]);
        assert_eq!(filter.update_linear(&z), Err(UkfError::NotInitialized));
    }

    #[test]
    fn test_linear_update_reduces_uncertainty() {
        let mut filter = tracking_filter([1.0, 2.0, 3.0, 0.4, 0.2], [1.0; 5]);
        filter.predict(0.1).unwrap();
        let trace_before = filter.covariance().trace();

        let nis = filter
            .update_linear(&MeasurementVector::from_array([1.3, 2.1]))
            .unwrap();

        assert!(filter.covariance().trace() <= trace_before);
        assert!(nis >= 0.0);
        assert_eq!(filter.nis(SensorKind::Linear), Some(nis));
        assert_eq!(filter.nis(SensorKind::Nonlinear), None);
    }

    #[test]
    fn test_nonlinear_update_wraps_bearing_residual() {
        // Target just across the ±π bearing seam
        let mut filter = tracking_filter([-10.0, 0.05, 1.0, 0.0, 0.0], [0.1, 1e-4, 0.1, 1e-4, 1e-4]);
        filter.predict(0.05).unwrap();
        let predicted_py = *filter.mean().index(1);

        let range = 10.0_f64.hypot(0.05);
        let bearing = -std::f64::consts::PI + 0.005;
        let nis = filter
            .update_nonlinear(&MeasurementVector::from_array([range, bearing, -1.0]))
            .unwrap();

        // Without wrapping the innovation would be about -2π and blow up NIS
        assert!(nis < 50.0, "NIS {}", nis);
        assert!((*filter.mean().index(1) - predicted_py).abs() < 0.5);
        assert!(filter.nis(SensorKind::Nonlinear).is_some());
    }

    #[test]
    fn test_degenerate_geometry_skips_correction() {
        // Zero velocity, zero noise at origin keeps the centre sigma point at (0, 0)
        let mut filter = tracking_filter([0.0, 0.0, 0.0, 0.0, 0.0], [1.0; 5]);
        filter.predict(0.0).unwrap();
        let predicted = filter.state().clone();

        let err = filter
            .update_nonlinear(&MeasurementVector::from_array([1.0, 0.0, 0.0]))
            .unwrap_err();

        assert_eq!(err, UkfError::DegenerateGeometry { sigma_index: 0 });
        assert_eq!(filter.state(), &predicted);
        assert_eq!(filter.nis(SensorKind::Nonlinear), None);
    }

    #[test]
    fn test_out_of_order_measurement_rejected() {
        let mut filter = UnscentedKalmanFilter::<f64>::new(UkfConfig::default()).unwrap();
        filter.process_measurement(&Measurement::linear(1_000, 1.0, 2.0)).unwrap();

        let err = filter
            .process_measurement(&Measurement::linear(500, 1.0, 2.0))
            .unwrap_err();

        assert_eq!(
            err,
            UkfError::OutOfOrderMeasurement {
                timestamp_us: 500,
                clock_us: 1_000
            }
        );
    }

    #[test]
    fn test_outcome_helpers() {
        let updated: StepOutcome<f64> = StepOutcome::Updated {
            kind: SensorKind::Nonlinear,
            nis: 1.0,
        };
        assert!(updated.is_update());
        assert_eq!(updated.kind(), SensorKind::Nonlinear);

        let skipped: StepOutcome<f64> = StepOutcome::Skipped {
            kind: SensorKind::Linear,
            reason: SkipReason::SensorDisabled,
        };
        assert!(!skipped.is_update());
    }
}
