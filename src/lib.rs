//! Mechsim – continuous-dynamics simulation core.
//!
//! This crate exposes a small rigid-body simulation kernel built around
//! a named variable store, a fixed-step Runge–Kutta integrator, and a
//! reaction-force constraint solver, with a ready-made double pendulum
//! model driven entirely by joint reaction forces.

pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod models;
pub mod utils;
pub mod world;

pub use glam::DVec2;

pub use crate::core::{
    rigidbody::RigidBody,
    variable::{Variable, TIME_NAME},
    vars::{VariableStore, VarsEvent},
};
pub use crate::dynamics::{
    forces::{Damping, ForceGenerator, ForceRegistry, Gravity, Spring},
    integrator::RungeKutta4,
    reaction::{Anchor, BodyAccel, Constraint, ReactionForce, ReactionSolver},
    system::DifferentiableSystem,
};
pub use crate::error::{ErrorKind, SimError, SimResult};
pub use crate::models::double_pendulum::DoublePendulum;
pub use crate::world::Simulation;

/// High-level convenience wrapper that owns a [`DoublePendulum`] simulation.
pub struct PendulumEngine {
    sim: Simulation<DoublePendulum>,
}

impl PendulumEngine {
    /// Creates a pendulum simulation with the provided parameters and
    /// initial rod angles (radians from straight down).
    pub fn new(gravity: f64, damping: f64, theta_1: f64, theta_2: f64) -> SimResult<Self> {
        let mut model = DoublePendulum::new(gravity, damping);
        let mut vars = model.make_vars()?;
        model.set_angles(&mut vars, theta_1, theta_2)?;
        Ok(Self {
            sim: Simulation::new(model, vars, config::DEFAULT_TIME_STEP),
        })
    }

    /// Advances the simulation by the provided delta time.
    pub fn step(&mut self, dt: f64) -> SimResult<()> {
        self.sim.step(dt)
    }

    /// Current rod angles and angular velocities `(theta_1, omega_1, theta_2, omega_2)`.
    pub fn joint_state(&self) -> SimResult<(f64, f64, f64, f64)> {
        DoublePendulum::joint_state(&self.sim.vars)
    }

    /// The variable store backing the simulation.
    pub fn vars(&self) -> &VariableStore {
        &self.sim.vars
    }

    /// Reaction forces computed during the most recent derivative evaluation.
    pub fn reaction_forces(&self) -> &[ReactionForce] {
        self.sim.model.reaction_forces()
    }
}
