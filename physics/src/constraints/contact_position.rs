use super::Position;
use crate::{
    config::WorldConfig,
    contact::ContactGraph,
    manifold::{ContactManifold, ContactType},
    math::{Transform, Vec2Ext},
};
use glam::Vec2;

/// One manifold point re-evaluated against moved transforms.
struct PositionManifold {
    /// Points from A to B.
    normal: Vec2,
    point: Vec2,
    /// Negative while penetrating.
    separation: f32,
}

impl PositionManifold {
    fn new(manifold: &ContactManifold, xf_a: &Transform, xf_b: &Transform, index: usize) -> Self {
        match manifold.contact_type {
            ContactType::Circles => {
                let center_a = xf_a.position;
                let center_b = xf_b.position;
                let normal = (center_b - center_a).normalize_or(manifold.normal);
                Self {
                    normal,
                    point: 0.5 * (center_a + center_b),
                    separation: (center_b - center_a).dot(normal)
                        - manifold.radius_a
                        - manifold.radius_b,
                }
            }
            ContactType::EdgeA => {
                let normal = xf_a.rotation.rotate(manifold.local_normal);
                let plane_point = xf_a.transform_point(manifold.local_point);
                let clip_point = xf_b.transform_point(manifold.inc_points[index]);
                Self {
                    normal,
                    point: clip_point - normal * manifold.radius_b,
                    separation: (clip_point - plane_point).dot(normal) - manifold.radius_b,
                }
            }
            ContactType::EdgeB => {
                let normal = xf_b.rotation.rotate(manifold.local_normal);
                let plane_point = xf_b.transform_point(manifold.local_point);
                let clip_point = xf_a.transform_point(manifold.inc_points[index]);
                Self {
                    // the reference normal points from B to A
                    normal: -normal,
                    point: clip_point - normal * manifold.radius_a,
                    separation: (clip_point - plane_point).dot(normal) - manifold.radius_a,
                }
            }
        }
    }
}

/// One pass of position correction over every contact, moving the provisional positions directly.
/// Returns the smallest separation seen, which is the deepest penetration when negative.
pub(crate) fn solve_position_constraints(
    contacts: &ContactGraph,
    positions: &mut [Position],
    config: &WorldConfig,
) -> f32 {
    let mut min_separation = 0.0_f32;

    for contact in contacts.iter() {
        if contact.solver_count == 0 {
            continue;
        }
        let m_a = contact.inv_mass_a;
        let i_a = contact.inv_inertia_a;
        let m_b = contact.inv_mass_b;
        let i_b = contact.inv_inertia_b;

        let mut pos_a = positions[contact.index_a];
        let mut pos_b = positions[contact.index_b];

        for index in 0..contact.manifold.count {
            let xf_a = Transform::new(pos_a.c, pos_a.a);
            let xf_b = Transform::new(pos_b.c, pos_b.a);
            let PositionManifold {
                normal,
                point,
                separation,
            } = PositionManifold::new(&contact.manifold, &xf_a, &xf_b, index);

            let r_a = point - pos_a.c;
            let r_b = point - pos_b.c;
            min_separation = min_separation.min(separation);

            // push out what exceeds the slop, a fraction at a time
            let correction = (config.baumgarte * (-separation - config.linear_slop))
                .max(0.0)
                .min(config.max_linear_correction);

            let rn_a = r_a.perp_dot(normal);
            let rn_b = r_b.perp_dot(normal);
            let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
            let impulse = if k > 0.0 { correction / k } else { 0.0 };
            let p = normal * impulse;

            pos_a.c -= m_a * p;
            pos_a.a -= i_a * r_a.perp_dot(p);
            pos_b.c += m_b * p;
            pos_b.a += i_b * r_b.perp_dot(p);
        }

        positions[contact.index_a] = pos_a;
        positions[contact.index_b] = pos_b;
    }

    min_separation
}
