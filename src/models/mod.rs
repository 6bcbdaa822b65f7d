//! Worked simulation models built on the core.

pub mod double_pendulum;
