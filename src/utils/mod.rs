//! Utility functions for filter evaluation
//!
//! NIS consistency checks.

mod consistency;

pub use consistency::*;
