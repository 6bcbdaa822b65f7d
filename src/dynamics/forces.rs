use glam::DVec2;

use crate::core::rigidbody::RigidBody;
use crate::dynamics::reaction::BodyAccel;

/// Trait describing an applied (unconstrained) force source.
///
/// Generators add their contribution to a body's acceleration accumulator;
/// body state itself is never mutated during an evaluation.
pub trait ForceGenerator {
    fn apply(&self, body: &RigidBody, accel: &mut BodyAccel);
}

/// Constant downward gravity.
pub struct Gravity {
    pub g: f64,
}

impl Gravity {
    pub fn new(g: f64) -> Self {
        Self { g }
    }
}

impl ForceGenerator for Gravity {
    fn apply(&self, _body: &RigidBody, accel: &mut BodyAccel) {
        accel.linear += DVec2::new(0.0, -self.g);
    }
}

/// Viscous damping proportional to linear and angular velocity, using each
/// body's own damping coefficients.
pub struct Damping {
    pub scale: f64,
}

impl Damping {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }
}

impl ForceGenerator for Damping {
    fn apply(&self, body: &RigidBody, accel: &mut BodyAccel) {
        accel.linear -= self.scale * body.linear_damping * body.velocity / body.mass;
        accel.angular -= self.scale * body.angular_damping * body.angular_velocity / body.moment;
    }
}

/// Hookean spring from a body-local attachment to a fixed world anchor.
pub struct Spring {
    pub attach: DVec2,
    pub anchor: DVec2,
    pub rest_length: f64,
    pub stiffness: f64,
}

impl ForceGenerator for Spring {
    fn apply(&self, body: &RigidBody, accel: &mut BodyAccel) {
        let point = body.world_point(self.attach);
        let displacement = point - self.anchor;
        let distance = displacement.length();
        if distance < 1e-12 {
            return;
        }
        let force = -self.stiffness * (distance - self.rest_length) * (displacement / distance);
        let r = body.rotate(self.attach);
        accel.linear += force / body.mass;
        accel.angular += r.perp_dot(force) / body.moment;
    }
}

/// Collection of force generators applied before constraint solving.
#[derive(Default)]
pub struct ForceRegistry {
    forces: Vec<Box<dyn ForceGenerator>>,
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_force<F: ForceGenerator + 'static>(&mut self, force: F) {
        self.forces.push(Box::new(force));
    }

    pub fn clear(&mut self) {
        self.forces.clear();
    }

    /// Accumulates all registered forces into the acceleration slots,
    /// one per body.
    pub fn apply_all(&self, bodies: &[RigidBody], accel: &mut [BodyAccel]) {
        for (body, slot) in bodies.iter().zip(accel.iter_mut()) {
            for force in &self.forces {
                force.apply(body, slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn gravity_is_mass_independent() {
        let heavy = RigidBody::new(10.0, 1.0);
        let mut accel = BodyAccel::default();
        Gravity::new(9.8).apply(&heavy, &mut accel);
        assert_abs_diff_eq!(accel.linear.y, -9.8);
    }

    #[test]
    fn damping_opposes_motion() {
        let mut body = RigidBody::new(2.0, 0.5);
        body.velocity = DVec2::new(3.0, 0.0);
        body.angular_velocity = -1.0;
        body.linear_damping = 0.4;
        body.angular_damping = 0.2;
        let mut accel = BodyAccel::default();
        Damping::new(1.0).apply(&body, &mut accel);
        assert_abs_diff_eq!(accel.linear.x, -0.4 * 3.0 / 2.0);
        assert_abs_diff_eq!(accel.angular, 0.2 / 0.5);
    }

    #[test]
    fn spring_pulls_toward_anchor_and_twists() {
        let mut body = RigidBody::new(1.0, 1.0);
        body.position = DVec2::new(2.0, 0.0);
        let spring = Spring {
            attach: DVec2::new(0.0, 0.5),
            anchor: DVec2::ZERO,
            rest_length: 0.0,
            stiffness: 1.0,
        };
        let mut accel = BodyAccel::default();
        spring.apply(&body, &mut accel);
        assert!(accel.linear.x < 0.0);
        // force acts above the center of mass, so it torques the body
        assert!(accel.angular.abs() > 0.0);
    }

    #[test]
    fn registry_applies_per_body() {
        let bodies = vec![RigidBody::default(), RigidBody::default()];
        let mut accel = vec![BodyAccel::default(); 2];
        let mut registry = ForceRegistry::new();
        registry.add_force(Gravity::new(9.8));
        registry.apply_all(&bodies, &mut accel);
        assert_abs_diff_eq!(accel[0].linear.y, -9.8);
        assert_abs_diff_eq!(accel[1].linear.y, -9.8);
    }
}
