//! Global configuration constants for the MechSim core.

/// Default downward gravity acceleration (m/s²).
pub const DEFAULT_GRAVITY: f64 = 9.8;

/// Default fixed integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f64 = 0.025;

/// Default viscous damping applied by models that support it.
pub const DEFAULT_DAMPING: f64 = 0.0;

/// Relative pivot-ratio threshold below which the constraint matrix is
/// reported as singular rather than solved.
pub const SINGULAR_PIVOT_TOLERANCE: f64 = 1e-10;

/// Number of recent state vectors kept in the diagnostic history buffer.
pub const DEFAULT_HISTORY_CAPACITY: usize = 16;
