//! Demo for the CTRV unscented Kalman filter
//!
//! Simulates one object moving on a CTRV trajectory, observed alternately by a
//! position sensor and a range/bearing/range-rate sensor every 50 ms, and
//! reports tracking error and NIS consistency.

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ctrv_ukf::filters::ukf::{SkipReason, StepOutcome, UnscentedKalmanFilter};
use ctrv_ukf::models::CtrvModel;
use ctrv_ukf::types::angle::normalize_angle;
use ctrv_ukf::types::measurement::{Measurement, SensorKind};
use ctrv_ukf::types::spaces::StateVector;
use ctrv_ukf::utils::{nis_bound_95, NisMonitor};
use ctrv_ukf::UkfConfig;

/// Measurement period in microseconds.
const MEASUREMENT_PERIOD_US: i64 = 50_000;

#[derive(Parser, Debug)]
#[command(name = "ctrv-ukf", about = "Track a simulated CTRV object with an unscented Kalman filter")]
struct Args {
    /// Seed for measurement noise
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Simulated duration in seconds
    #[arg(long, default_value_t = 25.0)]
    duration: f64,

    /// YAML filter configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ignore position measurements
    #[arg(long, default_value_t = false)]
    no_linear: bool,

    /// Ignore range/bearing measurements
    #[arg(long, default_value_t = false)]
    no_nonlinear: bool,

    /// Log every filter step
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

/// Noise-free CTRV ground truth.
struct Truth {
    model: CtrvModel<f64>,
    state: StateVector<f64>,
}

impl Truth {
    fn step(&mut self, dt: f64) {
        self.state = self.model.propagate(&self.state.augment(), dt);
    }

    fn velocity(&self) -> (f64, f64) {
        let v = *self.state.index(2);
        let yaw = *self.state.index(3);
        (v * yaw.cos(), v * yaw.sin())
    }
}

/// Draws noisy sensor readings from the true state.
struct Simulator {
    rng: StdRng,
    pos: [Normal<f64>; 2],
    polar: [Normal<f64>; 3],
}

impl Simulator {
    fn new(config: &UkfConfig, seed: u64) -> Result<Self, rand_distr::NormalError> {
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            pos: [
                Normal::new(0.0, config.std_pos1)?,
                Normal::new(0.0, config.std_pos2)?,
            ],
            polar: [
                Normal::new(0.0, config.std_range)?,
                Normal::new(0.0, config.std_bearing)?,
                Normal::new(0.0, config.std_range_rate)?,
            ],
        })
    }

    fn measure(&mut self, truth: &Truth, kind: SensorKind, timestamp_us: i64) -> Measurement<f64> {
        let px = *truth.state.index(0);
        let py = *truth.state.index(1);

        match kind {
            SensorKind::Linear => Measurement::linear(
                timestamp_us,
                px + self.pos[0].sample(&mut self.rng),
                py + self.pos[1].sample(&mut self.rng),
            ),
            SensorKind::Nonlinear => {
                let (vx, vy) = truth.velocity();
                let range = px.hypot(py);
                Measurement::nonlinear(
                    timestamp_us,
                    range + self.polar[0].sample(&mut self.rng),
                    normalize_angle(py.atan2(px) + self.polar[1].sample(&mut self.rng)),
                    (px * vx + py * vy) / range + self.polar[2].sample(&mut self.rng),
                )
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => UkfConfig::from_yaml_file(path)?,
        None => UkfConfig::default(),
    };
    if args.no_linear {
        config.use_linear_sensor = false;
    }
    if args.no_nonlinear {
        config.use_nonlinear_sensor = false;
    }
    info!(?config, "starting simulation");

    let mut filter = UnscentedKalmanFilter::<f64>::new(config.clone())?;
    let mut simulator = Simulator::new(&config, args.seed)?;
    let mut truth = Truth {
        model: CtrvModel::new(config.std_accel, config.std_yaw_accel),
        state: StateVector::from_array([2.0, 1.0, 4.0, 0.5, 0.15]),
    };
    let mut monitor = NisMonitor::new();

    let steps = (args.duration * 1e6 / MEASUREMENT_PERIOD_US as f64) as i64;
    let dt = MEASUREMENT_PERIOD_US as f64 / 1e6;
    let mut squared_error = [0.0_f64; 4];
    let mut scored = 0usize;

    for step in 0..=steps {
        let timestamp_us = step * MEASUREMENT_PERIOD_US;
        if step > 0 {
            truth.step(dt);
        }

        let kind = if step % 2 == 0 {
            SensorKind::Linear
        } else {
            SensorKind::Nonlinear
        };
        let measurement = simulator.measure(&truth, kind, timestamp_us);

        let outcome = filter.process_measurement(&measurement)?;
        monitor.record_outcome(&outcome);
        if let StepOutcome::Skipped {
            reason: SkipReason::DegenerateGeometry { sigma_index },
            ..
        } = outcome
        {
            warn!(timestamp_us, sigma_index, "update skipped");
        }

        let (px, py) = filter.state().position();
        let (vx, vy) = filter.state().velocity();
        let (tvx, tvy) = truth.velocity();
        let errors = [
            px - truth.state.index(0),
            py - truth.state.index(1),
            vx - tvx,
            vy - tvy,
        ];
        for (acc, e) in squared_error.iter_mut().zip(errors) {
            *acc += e * e;
        }
        scored += 1;

        debug!(
            timestamp_us,
            %kind,
            px,
            py,
            true_px = *truth.state.index(0),
            true_py = *truth.state.index(1),
            "step"
        );
    }

    let rmse = squared_error.map(|sum| (sum / scored as f64).sqrt());
    info!(
        px = rmse[0],
        py = rmse[1],
        vx = rmse[2],
        vy = rmse[3],
        "root mean squared error"
    );

    for kind in [SensorKind::Linear, SensorKind::Nonlinear] {
        let stats = monitor.stats(kind);
        info!(
            %kind,
            updates = stats.count,
            mean_nis = ?stats.mean(),
            above_95 = ?stats.fraction_above(),
            bound = nis_bound_95(kind),
            "NIS consistency"
        );
        if !monitor.is_consistent(kind, 0.1) {
            warn!(%kind, "more than 10% of NIS values above the 95% bound");
        }
    }

    Ok(())
}
