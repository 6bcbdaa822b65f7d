//! Shared helpers: logging and numeric utilities.

pub mod logging;
pub mod math;
