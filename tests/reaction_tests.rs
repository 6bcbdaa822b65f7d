use approx::assert_abs_diff_eq;
use glam::DVec2;
use mechsim::{
    Anchor, BodyAccel, Constraint, ErrorKind, ReactionSolver, RigidBody, SimError,
};

fn gravity_accel(n: usize, g: f64) -> Vec<BodyAccel> {
    vec![
        BodyAccel {
            linear: DVec2::new(0.0, -g),
            angular: 0.0,
        };
        n
    ]
}

/// Relative acceleration of the two anchor points along the constraint
/// normal, recomputed from the solved accelerations.
fn normal_residual(bodies: &[RigidBody], accel: &[BodyAccel], c: &Constraint) -> f64 {
    let point = |anchor: Anchor| match anchor {
        Anchor::Ground => DVec2::ZERO,
        Anchor::Body { index, attach } => {
            let r = bodies[index].rotate(attach);
            let omega = bodies[index].angular_velocity;
            accel[index].linear + accel[index].angular * r.perp() - omega * omega * r
        }
    };
    (point(c.anchor_b) - point(c.anchor_a)).dot(c.normal)
}

#[test]
fn pendulum_pins_have_zero_normal_acceleration() {
    // two swinging rods pinned like a double pendulum, mid-swing
    let mut rod1 = RigidBody::uniform_rod(1.0, 1.0);
    rod1.angle = 0.4;
    rod1.position = 0.5 * DVec2::new(0.4f64.sin(), -(0.4f64.cos()));
    rod1.angular_velocity = -0.8;
    rod1.velocity = rod1.angular_velocity * rod1.rotate(DVec2::new(0.0, -0.5)).perp();
    let mut rod2 = RigidBody::uniform_rod(1.0, 1.0);
    rod2.angle = -0.2;
    rod2.position = 2.0 * rod1.position + 0.5 * DVec2::new((-0.2f64).sin(), -((-0.2f64).cos()));
    rod2.angular_velocity = 1.3;
    rod2.velocity = rod1.point_velocity(DVec2::new(0.0, -0.5))
        + rod2.angular_velocity * rod2.rotate(DVec2::new(0.0, -0.5)).perp();
    let bodies = vec![rod1, rod2];

    let top = DVec2::new(0.0, 0.5);
    let bottom = DVec2::new(0.0, -0.5);
    let constraints = [
        Constraint::to_ground(0, top, DVec2::X),
        Constraint::to_ground(0, top, DVec2::Y),
        Constraint::between(0, bottom, 1, top, DVec2::X),
        Constraint::between(0, bottom, 1, top, DVec2::Y),
    ];

    let mut accel = gravity_accel(2, 9.8);
    let reactions = ReactionSolver::default()
        .solve(&bodies, &constraints, &mut accel)
        .unwrap();
    assert_eq!(reactions.len(), 4);
    for c in &constraints {
        assert_abs_diff_eq!(normal_residual(&bodies, &accel, c), 0.0, epsilon = 1e-10);
    }
}

#[test]
fn reaction_pair_is_equal_and_opposite() {
    // a body pinned to another should receive exactly the negated force
    let bodies = vec![RigidBody::new(1.0, 1.0), RigidBody::new(3.0, 1.0)];
    let constraints = [
        Constraint::between(0, DVec2::ZERO, 1, DVec2::ZERO, DVec2::Y),
        Constraint::to_ground(0, DVec2::ZERO, DVec2::Y),
    ];
    let mut accel = gravity_accel(2, 9.8);
    let reactions = ReactionSolver::default()
        .solve(&bodies, &constraints, &mut accel)
        .unwrap();
    // the pin between the bodies carries body 1's full weight
    assert_abs_diff_eq!(reactions[0].magnitude, 3.0 * 9.8, epsilon = 1e-9);
    // the ground pin carries both
    assert_abs_diff_eq!(reactions[1].magnitude, 4.0 * 9.8, epsilon = 1e-9);
    assert_abs_diff_eq!(accel[0].linear.y, 0.0, epsilon = 1e-10);
    assert_abs_diff_eq!(accel[1].linear.y, 0.0, epsilon = 1e-10);
}

#[test]
fn redundant_constraints_fail_without_side_effects() {
    let bodies = vec![RigidBody::uniform_rod(1.0, 1.0)];
    let c = Constraint::to_ground(0, DVec2::new(0.0, 0.5), DVec2::Y);
    let mut accel = gravity_accel(1, 9.8);
    let before = accel.clone();
    let err = ReactionSolver::default()
        .solve(&bodies, &[c, c], &mut accel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NumericalFailure);
    assert!(matches!(err, SimError::SingularMatrix { ratio, .. } if ratio < 1e-10));
    assert_eq!(accel, before);
}

#[test]
fn tighter_tolerance_rejects_marginal_systems() {
    // nearly parallel normals: solvable at the default tolerance, rejected
    // when the caller demands better conditioning
    let bodies = vec![RigidBody::new(1.0, 1.0)];
    let eps = 1e-4;
    let constraints = [
        Constraint::to_ground(0, DVec2::ZERO, DVec2::Y),
        Constraint::to_ground(0, DVec2::ZERO, DVec2::new(eps, 1.0).normalize()),
    ];
    let mut accel = gravity_accel(1, 9.8);
    ReactionSolver::default()
        .solve(&bodies, &constraints, &mut accel)
        .unwrap();

    let mut accel = gravity_accel(1, 9.8);
    let err = ReactionSolver::new(1e-3)
        .solve(&bodies, &constraints, &mut accel)
        .unwrap_err();
    assert!(matches!(err, SimError::SingularMatrix { .. }));
}
