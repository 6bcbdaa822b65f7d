use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Planar rigid body: mass properties plus kinematic state.
///
/// The reference point is the center of mass; `moment` is the moment of
/// inertia about it. Attachment points are expressed in body-local
/// coordinates relative to the center of mass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    pub mass: f64,
    pub moment: f64,
    pub position: DVec2,
    pub angle: f64,
    pub velocity: DVec2,
    pub angular_velocity: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            mass: 1.0,
            moment: 1.0,
            position: DVec2::ZERO,
            angle: 0.0,
            velocity: DVec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

impl RigidBody {
    pub fn new(mass: f64, moment: f64) -> Self {
        Self {
            mass,
            moment,
            ..Self::default()
        }
    }

    /// Uniform thin rod of the given mass and length, `I = m·L²/12`.
    pub fn uniform_rod(mass: f64, length: f64) -> Self {
        Self::new(mass, mass * length * length / 12.0)
    }

    /// Rotates a body-local offset into world orientation (no translation).
    pub fn rotate(&self, local: DVec2) -> DVec2 {
        DVec2::from_angle(self.angle).rotate(local)
    }

    /// World position of a body-local point.
    pub fn world_point(&self, local: DVec2) -> DVec2 {
        self.position + self.rotate(local)
    }

    /// Velocity of a body-local point, including the rotational part.
    pub fn point_velocity(&self, local: DVec2) -> DVec2 {
        self.velocity + self.angular_velocity * self.rotate(local).perp()
    }

    /// Translational plus rotational kinetic energy.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.length_squared()
            + 0.5 * self.moment * self.angular_velocity * self.angular_velocity
    }
}
