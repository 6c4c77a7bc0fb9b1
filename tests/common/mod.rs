//! Common test helpers for filter integration tests

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use ctrv_ukf::filters::ukf::{UkfState, UnscentedKalmanFilter};
use ctrv_ukf::models::CtrvModel;
use ctrv_ukf::types::measurement::{Measurement, SensorKind};
use ctrv_ukf::types::spaces::{StateCovariance, StateVector};
use ctrv_ukf::UkfConfig;

/// Creates a filter with the default configuration
pub fn make_filter() -> UnscentedKalmanFilter<f64> {
    UnscentedKalmanFilter::new(UkfConfig::default()).unwrap()
}

/// Creates a tracking filter at a known state
pub fn make_tracking_filter(
    config: UkfConfig,
    mean: [f64; 5],
    variance: f64,
    timestamp_us: i64,
) -> UnscentedKalmanFilter<f64> {
    let state = UkfState::new(
        StateVector::from_array(mean),
        StateCovariance::from_diagonal(&nalgebra::SVector::from([variance; 5])),
    );
    UnscentedKalmanFilter::from_state(config, state, timestamp_us).unwrap()
}

/// Noise-free CTRV trajectory
pub struct Trajectory {
    model: CtrvModel<f64>,
    pub state: StateVector<f64>,
}

impl Trajectory {
    pub fn new(px: f64, py: f64, v: f64, yaw: f64, yaw_rate: f64) -> Self {
        Self {
            model: CtrvModel::new(1.0, 1.0),
            state: StateVector::from_array([px, py, v, yaw, yaw_rate]),
        }
    }

    pub fn advance(&mut self, dt: f64) {
        self.state = self.model.propagate(&self.state.augment(), dt);
    }

    pub fn position(&self) -> (f64, f64) {
        (*self.state.index(0), *self.state.index(1))
    }

    pub fn velocity(&self) -> (f64, f64) {
        let v = *self.state.index(2);
        let yaw = *self.state.index(3);
        (v * yaw.cos(), v * yaw.sin())
    }

    /// Exact measurement of the current state
    pub fn measure(&self, kind: SensorKind, timestamp_us: i64) -> Measurement<f64> {
        let (px, py) = self.position();
        match kind {
            SensorKind::Linear => Measurement::linear(timestamp_us, px, py),
            SensorKind::Nonlinear => {
                let (vx, vy) = self.velocity();
                let range = px.hypot(py);
                Measurement::nonlinear(timestamp_us, range, py.atan2(px), (px * vx + py * vy) / range)
            }
        }
    }
}

/// Seeded additive Gaussian noise matching a configuration
pub struct SensorNoise {
    rng: StdRng,
    pos: Normal<f64>,
    range: Normal<f64>,
    bearing: Normal<f64>,
    range_rate: Normal<f64>,
}

impl SensorNoise {
    pub fn new(config: &UkfConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            pos: Normal::new(0.0, config.std_pos1).unwrap(),
            range: Normal::new(0.0, config.std_range).unwrap(),
            bearing: Normal::new(0.0, config.std_bearing).unwrap(),
            range_rate: Normal::new(0.0, config.std_range_rate).unwrap(),
        }
    }

    pub fn corrupt(&mut self, measurement: Measurement<f64>) -> Measurement<f64> {
        let values = measurement.values();
        match measurement.kind() {
            SensorKind::Linear => Measurement::linear(
                measurement.timestamp_us,
                values[0] + self.pos.sample(&mut self.rng),
                values[1] + self.pos.sample(&mut self.rng),
            ),
            SensorKind::Nonlinear => Measurement::nonlinear(
                measurement.timestamp_us,
                values[0] + self.range.sample(&mut self.rng),
                values[1] + self.bearing.sample(&mut self.rng),
                values[2] + self.range_rate.sample(&mut self.rng),
            ),
        }
    }
}

/// Alternates sensors starting with the linear one
pub fn alternating_kind(step: usize) -> SensorKind {
    if step % 2 == 0 {
        SensorKind::Linear
    } else {
        SensorKind::Nonlinear
    }
}

/// Euclidean distance between filter and true position
pub fn position_error(filter: &UnscentedKalmanFilter<f64>, truth: &Trajectory) -> f64 {
    let (px, py) = filter.state().position();
    let (tx, ty) = truth.position();
    (px - tx).hypot(py - ty)
}
