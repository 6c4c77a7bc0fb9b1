//! Unscented Kalman filtering
//!
//! - [`sigma`]: sigma point generation and weighted moment reconstruction
//! - [`ukf::UnscentedKalmanFilter`]: the CTRV filter with linear and
//!   nonlinear sensor updates

pub mod sigma;
pub mod ukf;
