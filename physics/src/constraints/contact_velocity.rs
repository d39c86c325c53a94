use super::{Position, Velocity};
use crate::{
    body::BodyArena,
    contact::{BlockMass, Contact, ContactGraph},
    math::{solve_block_lcp, Vec2Ext},
};
use glam::{Mat2, Vec2};

/// Bound on the condition number of the two point normal mass before the points are treated as
/// redundant.
const MAX_CONDITION_NUMBER: f32 = 1000.0;

/// Velocity of the contact point on B relative to the contact point on A.
#[inline]
fn relative_velocity(r_a: Vec2, r_b: Vec2, a: &Velocity, b: &Velocity) -> Vec2 {
    b.v + r_b.cross_scalar(b.w) - a.v - r_a.cross_scalar(a.w)
}

#[inline]
fn apply_impulse(contact: &Contact, r_a: Vec2, r_b: Vec2, p: Vec2, a: &mut Velocity, b: &mut Velocity) {
    a.v -= contact.inv_mass_a * p;
    a.w -= contact.inv_inertia_a * r_a.perp_dot(p);
    b.v += contact.inv_mass_b * p;
    b.w += contact.inv_inertia_b * r_b.perp_dot(p);
}

/// Builds lever arms, effective masses and restitution bias for every contact point.
pub(crate) fn init_velocity_constraints(
    contacts: &mut ContactGraph,
    bodies: &BodyArena,
    positions: &[Position],
    velocities: &[Velocity],
) {
    for contact in contacts.iter_mut() {
        let (body_a, body_b) = match (
            bodies.get_body(contact.body_a),
            bodies.get_body(contact.body_b),
        ) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                contact.solver_count = 0;
                continue;
            }
        };

        contact.index_a = body_a.solver_index;
        contact.index_b = body_b.solver_index;
        contact.inv_mass_a = body_a.solver_inv_mass();
        contact.inv_inertia_a = body_a.solver_inv_inertia();
        contact.inv_mass_b = body_b.solver_inv_mass();
        contact.inv_inertia_b = body_b.solver_inv_inertia();
        contact.friction = body_a.friction * body_b.friction;
        contact.restitution = body_a.restitution * body_b.restitution;

        let m_a = contact.inv_mass_a;
        let i_a = contact.inv_inertia_a;
        let m_b = contact.inv_mass_b;
        let i_b = contact.inv_inertia_b;

        let c_a = positions[contact.index_a].c;
        let c_b = positions[contact.index_b].c;
        let vel_a = velocities[contact.index_a];
        let vel_b = velocities[contact.index_b];

        let normal = contact.manifold.normal;
        let tangent = normal.perp();
        let restitution = contact.restitution;
        // slow approaches do not bounce
        let threshold = f32::min(-1.0, -10.0 * restitution);

        let count = contact.manifold.count;
        for (point, &world_point) in contact.points[..count]
            .iter_mut()
            .zip(&contact.manifold.points)
        {
            point.r_a = world_point - c_a;
            point.r_b = world_point - c_b;

            let rn_a = point.r_a.perp_dot(normal);
            let rn_b = point.r_b.perp_dot(normal);
            let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
            point.normal_mass = if k_normal > 0.0 { k_normal.recip() } else { 0.0 };

            let rt_a = point.r_a.perp_dot(tangent);
            let rt_b = point.r_b.perp_dot(tangent);
            let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
            point.tangent_mass = if k_tangent > 0.0 {
                k_tangent.recip()
            } else {
                0.0
            };

            let v_rel = normal.dot(relative_velocity(point.r_a, point.r_b, &vel_a, &vel_b));
            point.velocity_bias = if v_rel < threshold {
                -restitution * v_rel
            } else {
                0.0
            };
        }

        contact.solver_count = count;
        contact.block = None;
        if count == 2 {
            let [cp1, cp2] = &contact.points;
            let rn1_a = cp1.r_a.perp_dot(normal);
            let rn1_b = cp1.r_b.perp_dot(normal);
            let rn2_a = cp2.r_a.perp_dot(normal);
            let rn2_b = cp2.r_b.perp_dot(normal);

            let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
            let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
            let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

            if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                let k = Mat2::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));
                contact.block = Some(BlockMass {
                    k,
                    normal_mass: k.inverse(),
                });
            } else {
                // the points are nearly redundant, solve the first one only
                contact.solver_count = 1;
                contact.points[1].normal_impulse = 0.0;
                contact.points[1].tangent_impulse = 0.0;
            }
        }
    }
}

/// Applies the impulses carried over from the previous step.
pub(crate) fn warm_start(contacts: &mut ContactGraph, velocities: &mut [Velocity], scale: f32) {
    for contact in contacts.iter_mut() {
        if contact.solver_count == 0 {
            continue;
        }
        let normal = contact.manifold.normal;
        let tangent = normal.perp();
        let mut vel_a = velocities[contact.index_a];
        let mut vel_b = velocities[contact.index_b];

        for i in 0..contact.solver_count {
            let point = &mut contact.points[i];
            point.normal_impulse *= scale;
            point.tangent_impulse *= scale;
            let p = normal * point.normal_impulse + tangent * point.tangent_impulse;
            let (r_a, r_b) = (point.r_a, point.r_b);
            apply_impulse(contact, r_a, r_b, p, &mut vel_a, &mut vel_b);
        }

        velocities[contact.index_a] = vel_a;
        velocities[contact.index_b] = vel_b;
    }
}

/// One sequential impulse pass over every contact. Friction goes first, bounded by the normal
/// impulse accumulated so far.
pub(crate) fn solve_velocity_constraints(contacts: &mut ContactGraph, velocities: &mut [Velocity]) {
    for contact in contacts.iter_mut() {
        let count = contact.solver_count;
        if count == 0 {
            continue;
        }
        let normal = contact.manifold.normal;
        let tangent = normal.perp();
        let friction = contact.friction;
        let mut vel_a = velocities[contact.index_a];
        let mut vel_b = velocities[contact.index_b];

        for i in 0..count {
            let point = contact.points[i];
            let dv = relative_velocity(point.r_a, point.r_b, &vel_a, &vel_b);
            let lambda = -point.tangent_mass * dv.dot(tangent);

            let max_friction = friction * point.normal_impulse;
            let new_impulse = (point.tangent_impulse + lambda)
                .max(-max_friction)
                .min(max_friction);
            let lambda = new_impulse - point.tangent_impulse;
            contact.points[i].tangent_impulse = new_impulse;

            apply_impulse(contact, point.r_a, point.r_b, tangent * lambda, &mut vel_a, &mut vel_b);
        }

        match contact.block {
            Some(block) if count == 2 => {
                let [cp1, cp2] = contact.points;
                let a = Vec2::new(cp1.normal_impulse, cp2.normal_impulse);

                let vn1 = relative_velocity(cp1.r_a, cp1.r_b, &vel_a, &vel_b).dot(normal);
                let vn2 = relative_velocity(cp2.r_a, cp2.r_b, &vel_a, &vel_b).dot(normal);
                let b = Vec2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias) - block.k * a;

                let x = solve_block_lcp(&block.k, &block.normal_mass, b);
                let d = x - a;
                apply_impulse(contact, cp1.r_a, cp1.r_b, normal * d.x, &mut vel_a, &mut vel_b);
                apply_impulse(contact, cp2.r_a, cp2.r_b, normal * d.y, &mut vel_a, &mut vel_b);

                contact.points[0].normal_impulse = x.x;
                contact.points[1].normal_impulse = x.y;
            }
            _ => {
                for i in 0..count {
                    let point = contact.points[i];
                    let vn = relative_velocity(point.r_a, point.r_b, &vel_a, &vel_b).dot(normal);
                    let lambda = -point.normal_mass * (vn - point.velocity_bias);

                    let new_impulse = (point.normal_impulse + lambda).max(0.0);
                    let lambda = new_impulse - point.normal_impulse;
                    contact.points[i].normal_impulse = new_impulse;

                    apply_impulse(contact, point.r_a, point.r_b, normal * lambda, &mut vel_a, &mut vel_b);
                }
            }
        }

        velocities[contact.index_a] = vel_a;
        velocities[contact.index_b] = vel_b;
    }
}
