//! Double pendulum assembled from rigid rods and pin joints, driven purely
//! by reaction forces.
//!
//! Two uniform rods hang from the origin: rod 1 is pinned to the world at
//! its upper end, rod 2 to rod 1's lower end. Each pin is a pair of
//! constraints with orthogonal normals, so every evaluation solves a 4x4
//! system. The state vector carries full planar body coordinates rather
//! than joint angles; the joints hold because the solver drives relative
//! acceleration at both pins to zero.

use glam::DVec2;

use crate::config::{DEFAULT_DAMPING, DEFAULT_GRAVITY};
use crate::core::rigidbody::RigidBody;
use crate::core::vars::VariableStore;
use crate::dynamics::forces::{Damping, ForceRegistry, Gravity};
use crate::dynamics::reaction::{BodyAccel, Constraint, ReactionForce, ReactionSolver};
use crate::dynamics::system::DifferentiableSystem;
use crate::error::{SimError, SimResult};

/// Reaction-force double pendulum model.
pub struct DoublePendulum {
    gravity: f64,
    damping: f64,
    rod_mass: f64,
    rod_length: f64,
    solver: ReactionSolver,
    forces: ForceRegistry,
    bodies: [RigidBody; 2],
    accel: [BodyAccel; 2],
    last_reactions: Vec<ReactionForce>,
}

impl DoublePendulum {
    pub const X_1: usize = 0;
    pub const Y_1: usize = 1;
    pub const ANGLE_1: usize = 2;
    pub const VX_1: usize = 3;
    pub const VY_1: usize = 4;
    pub const OMEGA_1: usize = 5;
    pub const X_2: usize = 6;
    pub const Y_2: usize = 7;
    pub const ANGLE_2: usize = 8;
    pub const VX_2: usize = 9;
    pub const VY_2: usize = 10;
    pub const OMEGA_2: usize = 11;
    pub const TIME: usize = 12;
    pub const KE: usize = 13;
    pub const PE: usize = 14;
    pub const TE: usize = 15;

    pub const VAR_COUNT: usize = 16;

    pub fn new(gravity: f64, damping: f64) -> Self {
        let mut rod = RigidBody::uniform_rod(1.0, 1.0);
        rod.angular_damping = damping;
        let mut model = Self {
            gravity,
            damping,
            rod_mass: 1.0,
            rod_length: 1.0,
            solver: ReactionSolver::default(),
            forces: ForceRegistry::new(),
            bodies: [rod.clone(), rod],
            accel: [BodyAccel::default(); 2],
            last_reactions: Vec::new(),
        };
        model.rebuild_forces();
        model
    }

    fn rebuild_forces(&mut self) {
        self.forces.clear();
        self.forces.add_force(Gravity::new(self.gravity));
        if self.damping != 0.0 {
            self.forces.add_force(Damping::new(1.0));
        }
    }

    /// Creates the variable store for this model: twelve body state
    /// variables, time, and three computed energy variables.
    pub fn make_vars(&self) -> SimResult<VariableStore> {
        let mut vars = VariableStore::new();
        vars.add_variable_block(&[
            "x 1",
            "y 1",
            "angle 1",
            "vx 1",
            "vy 1",
            "omega 1",
            "x 2",
            "y 2",
            "angle 2",
            "vx 2",
            "vy 2",
            "omega 2",
            "time",
            "kinetic energy",
            "potential energy",
            "total energy",
        ])?;
        for index in [Self::KE, Self::PE, Self::TE] {
            vars.set_computed(index, true)?;
        }
        Ok(vars)
    }

    /// Positions both rods from joint angles (measured from straight down,
    /// counterclockwise positive) with all velocities zero. A discontinuous
    /// reconfiguration: sequence numbers advance.
    pub fn set_angles(
        &mut self,
        vars: &mut VariableStore,
        theta1: f64,
        theta2: f64,
    ) -> SimResult<()> {
        let half = self.rod_length / 2.0;
        let d1 = DVec2::new(theta1.sin(), -theta1.cos());
        let d2 = DVec2::new(theta2.sin(), -theta2.cos());
        let cm1 = half * d1;
        let cm2 = self.rod_length * d1 + half * d2;
        let values = [
            (Self::X_1, cm1.x),
            (Self::Y_1, cm1.y),
            (Self::ANGLE_1, theta1),
            (Self::VX_1, 0.0),
            (Self::VY_1, 0.0),
            (Self::OMEGA_1, 0.0),
            (Self::X_2, cm2.x),
            (Self::Y_2, cm2.y),
            (Self::ANGLE_2, theta2),
            (Self::VX_2, 0.0),
            (Self::VY_2, 0.0),
            (Self::OMEGA_2, 0.0),
        ];
        for (index, value) in values {
            vars.set_value(index, value, false)?;
        }
        self.refresh_computed(vars)
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Changing gravity invalidates the derived energies; flag them.
    pub fn set_gravity(&mut self, vars: &mut VariableStore, gravity: f64) -> SimResult<()> {
        self.gravity = gravity;
        self.rebuild_forces();
        vars.increment_sequence(&[Self::KE, Self::PE, Self::TE])?;
        self.refresh_computed(vars)
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn set_damping(&mut self, vars: &mut VariableStore, damping: f64) -> SimResult<()> {
        self.damping = damping;
        for body in &mut self.bodies {
            body.angular_damping = damping;
        }
        self.rebuild_forces();
        vars.increment_sequence(&[Self::KE, Self::PE, Self::TE])?;
        Ok(())
    }

    /// Reaction forces from the most recent evaluation, for display.
    pub fn reaction_forces(&self) -> &[ReactionForce] {
        &self.last_reactions
    }

    /// Reads (angle1, angle1', angle2, angle2') out of the store.
    pub fn joint_state(vars: &VariableStore) -> SimResult<(f64, f64, f64, f64)> {
        Ok((
            vars.get_value(Self::ANGLE_1)?,
            vars.get_value(Self::OMEGA_1)?,
            vars.get_value(Self::ANGLE_2)?,
            vars.get_value(Self::OMEGA_2)?,
        ))
    }

    fn sync_bodies(&mut self, state: &[f64]) {
        for (k, body) in self.bodies.iter_mut().enumerate() {
            let base = 6 * k;
            body.position = DVec2::new(state[base], state[base + 1]);
            body.angle = state[base + 2];
            body.velocity = DVec2::new(state[base + 3], state[base + 4]);
            body.angular_velocity = state[base + 5];
        }
    }

    fn constraints(&self) -> [Constraint; 4] {
        let half = self.rod_length / 2.0;
        let top = DVec2::new(0.0, half);
        let bottom = DVec2::new(0.0, -half);
        [
            Constraint::to_ground(0, top, DVec2::X),
            Constraint::to_ground(0, top, DVec2::Y),
            Constraint::between(0, bottom, 1, top, DVec2::X),
            Constraint::between(0, bottom, 1, top, DVec2::Y),
        ]
    }

    fn check_len(&self, actual: usize) -> SimResult<()> {
        if actual != Self::VAR_COUNT {
            return Err(SimError::LengthMismatch {
                expected: Self::VAR_COUNT,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for DoublePendulum {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVITY, DEFAULT_DAMPING)
    }
}

impl DifferentiableSystem for DoublePendulum {
    fn evaluate(&mut self, vars: &[f64], change: &mut [f64], _dt: f64) -> SimResult<()> {
        self.check_len(vars.len())?;
        self.check_len(change.len())?;
        self.sync_bodies(vars);

        self.accel = [BodyAccel::default(); 2];
        self.forces.apply_all(&self.bodies, &mut self.accel);

        let constraints = self.constraints();
        self.last_reactions = self
            .solver
            .solve(&self.bodies, &constraints, &mut self.accel)?;

        change.fill(0.0);
        for (k, body) in self.bodies.iter().enumerate() {
            let base = 6 * k;
            change[base] = body.velocity.x;
            change[base + 1] = body.velocity.y;
            change[base + 2] = body.angular_velocity;
            change[base + 3] = self.accel[k].linear.x;
            change[base + 4] = self.accel[k].linear.y;
            change[base + 5] = self.accel[k].angular;
        }
        change[Self::TIME] = 1.0;
        Ok(())
    }

    fn refresh_computed(&mut self, vars: &mut VariableStore) -> SimResult<()> {
        let state = vars.values(true);
        self.check_len(state.len())?;
        self.sync_bodies(&state);
        let half = self.rod_length / 2.0;
        let ke: f64 = self.bodies.iter().map(|b| b.kinetic_energy()).sum();
        // potential zero at the hanging rest configuration
        let rest = [-half, -(self.rod_length + half)];
        let pe: f64 = self
            .bodies
            .iter()
            .zip(rest)
            .map(|(b, y0)| self.rod_mass * self.gravity * (b.position.y - y0))
            .sum();
        vars.set_value(Self::KE, ke, true)?;
        vars.set_value(Self::PE, pe, true)?;
        vars.set_value(Self::TE, ke + pe, true)?;
        Ok(())
    }
}
