//! Core types for type-safe vector spaces, measurements and filter phases

pub mod angle;
pub mod measurement;
pub mod phase;
pub mod spaces;
