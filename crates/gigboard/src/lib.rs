//! Gig marketplace core: application lifecycle, worker reputation, and the
//! ranked worker directory.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
