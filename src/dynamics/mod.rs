//! Dynamics: the model contract, the RK4 integrator, applied forces, and
//! the reaction-force constraint solver.

pub mod forces;
pub mod integrator;
pub mod reaction;
pub mod system;
