use crate::core::vars::VariableStore;
use crate::error::SimResult;

/// The contract a simulated model implements for the integrator.
///
/// `evaluate` receives the full state vector and must fully populate
/// `change` with its time-derivative: zero for variables with no dynamics,
/// the constant `1.0` for a time slot. Computed variables arrive masked to
/// NaN and their change entries are ignored. Returning an error aborts the
/// enclosing integration step with no state committed.
pub trait DifferentiableSystem {
    fn evaluate(&mut self, vars: &[f64], change: &mut [f64], dt: f64) -> SimResult<()>;

    /// Recomputes computed variables (e.g. energies) from the freshly
    /// committed state. Called by the driver after each successful step.
    fn refresh_computed(&mut self, _vars: &mut VariableStore) -> SimResult<()> {
        Ok(())
    }
}
