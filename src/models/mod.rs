//! Motion and sensor models
//!
//! This module defines the CTRV motion model and the two sensor models the
//! filter fuses.

mod observation;
mod transition;

pub use observation::*;
pub use transition::*;
