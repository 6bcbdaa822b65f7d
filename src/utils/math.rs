//! Small numeric helpers layered on top of `glam`.

use crate::error::{SimError, SimResult};

/// Whether `a` and `b` differ by more than `epsilon`, scaled by the larger
/// of their magnitudes and `magnitude`.
///
/// `epsilon` and `magnitude` must be finite and positive; passing anything
/// else is a numerical failure, not a silent `false`.
pub fn very_different(a: f64, b: f64, epsilon: f64, magnitude: f64) -> SimResult<bool> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(SimError::NonFiniteArgument(epsilon));
    }
    if !(magnitude.is_finite() && magnitude > 0.0) {
        return Err(SimError::NonFiniteArgument(magnitude));
    }
    let scale = a.abs().max(b.abs()).max(magnitude);
    Ok((a - b).abs() > epsilon * scale)
}
