//! Reaction-force solver for equality constraints.
//!
//! Given the kinematic state of the constrained bodies and their
//! unconstrained accelerations (gravity, damping, springs already applied),
//! the solver computes the reaction-force magnitudes along each constraint
//! normal such that relative acceleration at every constraint point is
//! exactly zero along that normal. The constraints form a small dense linear
//! system `A·f = -B` solved every evaluation; nothing here persists across
//! steps.
//!
//! Only bilateral (joint/pivot) constraints are handled. Unilateral contacts
//! need a complementarity solve and are a separate, larger problem.

use glam::DVec2;
use log::warn;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::config::SINGULAR_PIVOT_TOLERANCE;
use crate::core::rigidbody::RigidBody;
use crate::error::{SimError, SimResult};

/// One side of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    /// Fixed point in the world; contributes no response to the system.
    Ground,
    /// Attachment on body `index`, offset in body-local coordinates
    /// relative to the center of mass.
    Body { index: usize, attach: DVec2 },
}

/// An equality constraint pinning relative acceleration between its two
/// anchors to zero along `normal` (a world-space unit vector).
///
/// Sign convention: the solved force `f·normal` acts on the `b` side and
/// `-f·normal` on the `a` side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub anchor_a: Anchor,
    pub anchor_b: Anchor,
    pub normal: DVec2,
}

impl Constraint {
    /// Pins a body-local point to a fixed world anchor along `normal`.
    pub fn to_ground(body: usize, attach: DVec2, normal: DVec2) -> Self {
        Self {
            anchor_a: Anchor::Ground,
            anchor_b: Anchor::Body {
                index: body,
                attach,
            },
            normal,
        }
    }

    /// Connects local points on two bodies along `normal`.
    pub fn between(
        body_a: usize,
        attach_a: DVec2,
        body_b: usize,
        attach_b: DVec2,
        normal: DVec2,
    ) -> Self {
        Self {
            anchor_a: Anchor::Body {
                index: body_a,
                attach: attach_a,
            },
            anchor_b: Anchor::Body {
                index: body_b,
                attach: attach_b,
            },
            normal,
        }
    }
}

/// Linear and angular acceleration accumulator for one body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyAccel {
    pub linear: DVec2,
    pub angular: f64,
}

/// Transient per-constraint diagnostic produced by a solve, e.g. for
/// force-arrow rendering. Not part of the dynamics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionForce {
    pub constraint: usize,
    pub magnitude: f64,
    pub force: DVec2,
    pub applied_at: DVec2,
}

/// Solves the active constraint set for reaction-force magnitudes.
#[derive(Debug, Clone, Copy)]
pub struct ReactionSolver {
    /// Smallest-to-largest pivot ratio below which the system is reported
    /// singular instead of solved.
    pub tolerance: f64,
}

impl Default for ReactionSolver {
    fn default() -> Self {
        Self {
            tolerance: SINGULAR_PIVOT_TOLERANCE,
        }
    }
}

/// World-space attachment data for one constraint side.
#[derive(Clone, Copy)]
struct Side {
    body: Option<usize>,
    /// Offset from the body's center of mass, rotated into world orientation.
    r: DVec2,
}

impl ReactionSolver {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Computes reaction forces and accumulates their accelerations into
    /// `accel`, which on entry holds the unconstrained accelerations and on
    /// success holds the constrained ones. Returns per-constraint
    /// diagnostics. `accel` is untouched when an error is returned.
    pub fn solve(
        &self,
        bodies: &[RigidBody],
        constraints: &[Constraint],
        accel: &mut [BodyAccel],
    ) -> SimResult<Vec<ReactionForce>> {
        if accel.len() != bodies.len() {
            return Err(SimError::LengthMismatch {
                expected: bodies.len(),
                actual: accel.len(),
            });
        }
        let n = constraints.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut sides = Vec::with_capacity(n);
        for c in constraints {
            sides.push((
                resolve_side(bodies, c.anchor_a)?,
                resolve_side(bodies, c.anchor_b)?,
            ));
        }

        // B[i]: acceleration along normal_i with zero reaction force,
        // including the centripetal -omega^2 r term of each anchor point.
        let mut b = DVector::<f64>::zeros(n);
        for (i, c) in constraints.iter().enumerate() {
            let (side_a, side_b) = sides[i];
            let mut rel = point_accel(bodies, accel, side_b);
            rel -= point_accel(bodies, accel, side_a);
            b[i] = rel.dot(c.normal);
        }

        // A[i][j]: acceleration induced at constraint i per unit force along
        // constraint j's normal; each body shared by both constraints
        // contributes its linear (1/m) and rotational ((r x n)/I) response.
        let mut a = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            let ni = constraints[i].normal;
            for j in 0..n {
                let nj = constraints[j].normal;
                let mut sum = 0.0;
                for (side_i, sign_i) in [(sides[i].0, -1.0), (sides[i].1, 1.0)] {
                    let Some(bi) = side_i.body else { continue };
                    for (side_j, sign_j) in [(sides[j].0, -1.0), (sides[j].1, 1.0)] {
                        let Some(bj) = side_j.body else { continue };
                        if bi != bj {
                            continue;
                        }
                        let body = &bodies[bi];
                        sum += sign_i
                            * sign_j
                            * (ni.dot(nj) / body.mass
                                + side_j.r.perp_dot(nj) * side_i.r.perp_dot(ni) / body.moment);
                    }
                }
                a[(i, j)] = sum;
            }
        }

        let lu = a.lu();
        let ratio = pivot_ratio(lu.u().diagonal().as_slice());
        if !(ratio >= self.tolerance) {
            warn!(
                "constraint matrix ill-conditioned: pivot ratio {:.3e} (n = {})",
                ratio, n
            );
            return Err(SimError::SingularMatrix {
                ratio,
                tolerance: self.tolerance,
            });
        }
        let f = lu.solve(&(-b)).ok_or(SimError::SingularMatrix {
            ratio,
            tolerance: self.tolerance,
        })?;

        let mut reactions = Vec::with_capacity(n);
        for (j, c) in constraints.iter().enumerate() {
            let (side_a, side_b) = sides[j];
            apply_reaction(bodies, accel, side_a, -f[j], c.normal);
            apply_reaction(bodies, accel, side_b, f[j], c.normal);
            let applied_at = match (side_b.body, side_a.body) {
                (Some(idx), _) => bodies[idx].position + side_b.r,
                (None, Some(idx)) => bodies[idx].position + side_a.r,
                (None, None) => DVec2::ZERO,
            };
            reactions.push(ReactionForce {
                constraint: j,
                magnitude: f[j],
                force: f[j] * c.normal,
                applied_at,
            });
        }
        Ok(reactions)
    }
}

fn resolve_side(bodies: &[RigidBody], anchor: Anchor) -> SimResult<Side> {
    match anchor {
        Anchor::Ground => Ok(Side {
            body: None,
            r: DVec2::ZERO,
        }),
        Anchor::Body { index, attach } => {
            let body = bodies.get(index).ok_or(SimError::BodyOutOfRange {
                index,
                len: bodies.len(),
            })?;
            Ok(Side {
                body: Some(index),
                r: body.rotate(attach),
            })
        }
    }
}

/// Acceleration of a constraint anchor point under the given body
/// accelerations: `a_cm + alpha x r - omega^2 r`, zero for ground.
fn point_accel(bodies: &[RigidBody], accel: &[BodyAccel], side: Side) -> DVec2 {
    match side.body {
        None => DVec2::ZERO,
        Some(idx) => {
            let omega = bodies[idx].angular_velocity;
            accel[idx].linear + accel[idx].angular * side.r.perp() - omega * omega * side.r
        }
    }
}

fn apply_reaction(
    bodies: &[RigidBody],
    accel: &mut [BodyAccel],
    side: Side,
    magnitude: f64,
    normal: DVec2,
) {
    if let Some(idx) = side.body {
        let body = &bodies[idx];
        accel[idx].linear += magnitude * normal / body.mass;
        accel[idx].angular += magnitude * side.r.perp_dot(normal) / body.moment;
    }
}

/// Smallest-to-largest absolute pivot ratio of an LU factorization's
/// U diagonal; 0.0 for an exactly singular system, NaN when empty input
/// contains non-finite pivots.
fn pivot_ratio(diag: &[f64]) -> f64 {
    let mut min = f64::INFINITY;
    let mut max: f64 = 0.0;
    for &d in diag {
        let d = d.abs();
        if !d.is_finite() {
            return f64::NAN;
        }
        min = min.min(d);
        max = max.max(d);
    }
    if max == 0.0 {
        0.0
    } else {
        min / max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn hanging_body() -> (Vec<RigidBody>, Vec<BodyAccel>) {
        let body = RigidBody::new(2.0, 1.0);
        let accel = vec![BodyAccel {
            linear: DVec2::new(0.0, -9.8),
            angular: 0.0,
        }];
        (vec![body], accel)
    }

    #[test]
    fn single_support_cancels_gravity() {
        let (bodies, mut accel) = hanging_body();
        let constraints = [Constraint::to_ground(0, DVec2::ZERO, DVec2::Y)];
        let solver = ReactionSolver::default();
        let reactions = solver.solve(&bodies, &constraints, &mut accel).unwrap();
        assert_eq!(reactions.len(), 1);
        // f = m * g holds the body still
        assert_abs_diff_eq!(reactions[0].magnitude, 2.0 * 9.8, epsilon = 1e-12);
        assert_abs_diff_eq!(accel[0].linear.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(accel[0].angular, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn duplicate_constraints_reported_singular() {
        let (bodies, mut accel) = hanging_body();
        let c = Constraint::to_ground(0, DVec2::new(0.0, 0.5), DVec2::Y);
        let constraints = [c, c];
        let before = accel.clone();
        let err = ReactionSolver::default()
            .solve(&bodies, &constraints, &mut accel)
            .unwrap_err();
        assert!(matches!(err, SimError::SingularMatrix { .. }));
        assert_eq!(accel, before);
    }

    #[test]
    fn empty_constraint_set_is_a_noop() {
        let (bodies, mut accel) = hanging_body();
        let reactions = ReactionSolver::default()
            .solve(&bodies, &[], &mut accel)
            .unwrap();
        assert!(reactions.is_empty());
        assert_abs_diff_eq!(accel[0].linear.y, -9.8);
    }

    #[test]
    fn bad_body_index_is_loud() {
        let (bodies, mut accel) = hanging_body();
        let constraints = [Constraint::to_ground(3, DVec2::ZERO, DVec2::Y)];
        let err = ReactionSolver::default()
            .solve(&bodies, &constraints, &mut accel)
            .unwrap_err();
        assert!(matches!(err, SimError::BodyOutOfRange { index: 3, len: 1 }));
    }

    #[test]
    fn offset_support_balances_torque() {
        // support under one end of a rod held horizontal: the solved force
        // must zero the normal acceleration at that point exactly
        let rod = RigidBody::uniform_rod(1.0, 1.0);
        let bodies = vec![rod];
        let mut accel = vec![BodyAccel {
            linear: DVec2::new(0.0, -9.8),
            angular: 0.0,
        }];
        let attach = DVec2::new(0.5, 0.0);
        let constraints = [Constraint::to_ground(0, attach, DVec2::Y)];
        ReactionSolver::default()
            .solve(&bodies, &constraints, &mut accel)
            .unwrap();
        let r = bodies[0].rotate(attach);
        let point = accel[0].linear + accel[0].angular * r.perp();
        assert_abs_diff_eq!(point.dot(DVec2::Y), 0.0, epsilon = 1e-10);
    }
}
