use crate::{
    gjk,
    manifold::{best_edge, polygon_manifold, ContactManifold, ContactType, FeatureId},
    math::{Transform, Vec2Ext},
    shapes::{Shape, ShapeBox, ShapeCircle, ShapeKind},
};
use glam::Vec2;

/// Narrow phase entry point. Returns the manifold with its normal pointing from A to B, or `None`
/// when the shapes do not touch.
pub fn collide(
    shape_a: &Shape,
    xf_a: &Transform,
    shape_b: &Shape,
    xf_b: &Transform,
) -> Option<ContactManifold> {
    match (shape_a, shape_b) {
        (Shape::Circle(a), Shape::Circle(b)) => circle_circle(a, xf_a, b, xf_b),
        (Shape::Circle(a), Shape::Box(b)) => circle_box(a, xf_a, b, xf_b),
        (Shape::Circle(_), Shape::Polygon(_)) => circle_polygon(shape_a, xf_a, shape_b, xf_b),
        (Shape::Box(a), Shape::Circle(b)) => circle_box(b, xf_b, a, xf_a).map(ContactManifold::flip),
        (Shape::Box(a), Shape::Box(b)) => box_box(a, xf_a, b, xf_b),
        (Shape::Box(_), Shape::Polygon(_)) => polygon_polygon(shape_a, xf_a, shape_b, xf_b),
        (Shape::Polygon(_), Shape::Circle(_)) => {
            circle_polygon(shape_b, xf_b, shape_a, xf_a).map(ContactManifold::flip)
        }
        (Shape::Polygon(_), Shape::Box(_)) => {
            polygon_polygon(shape_b, xf_b, shape_a, xf_a).map(ContactManifold::flip)
        }
        (Shape::Polygon(_), Shape::Polygon(_)) => polygon_polygon(shape_a, xf_a, shape_b, xf_b),
    }
}

pub fn circle_circle(
    a: &ShapeCircle,
    xf_a: &Transform,
    b: &ShapeCircle,
    xf_b: &Transform,
) -> Option<ContactManifold> {
    let delta = xf_b.position - xf_a.position;
    let radius = a.radius + b.radius;
    let dist_sq = delta.length_squared();
    if dist_sq > radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = delta.normalize_or(Vec2::X);
    Some(ContactManifold {
        normal,
        points: [xf_a.position + normal * a.radius, Vec2::ZERO],
        depths: [radius - dist, 0.0],
        count: 1,
        contact_type: ContactType::Circles,
        feature: FeatureId::new(ShapeKind::Circle, ShapeKind::Circle, 0, 0, false),
        ref_points: [Vec2::new(a.radius, 0.0), Vec2::new(b.radius, 0.0)],
        inc_points: [Vec2::ZERO; 2],
        local_normal: normal,
        local_point: Vec2::ZERO,
        radius_a: a.radius,
        radius_b: b.radius,
    })
}

/// Index of the box edge whose outward normal is closest to `outward`. Edge `i` runs from corner
/// `i` to corner `i + 1` of [`ShapeBox::local_vertices`].
fn box_face(outward: Vec2) -> usize {
    if outward.x.abs() > outward.y.abs() {
        if outward.x > 0.0 {
            3
        } else {
            1
        }
    } else if outward.y > 0.0 {
        0
    } else {
        2
    }
}

/// The box is the reference body, so the manifold is always of type `EdgeB`.
pub fn circle_box(
    a: &ShapeCircle,
    xf_a: &Transform,
    b: &ShapeBox,
    xf_b: &Transform,
) -> Option<ContactManifold> {
    let half = b.half_extents;
    let center = xf_b.inv_transform_point(xf_a.position);
    let clamped = center.clamp(-half, half);

    // face normal pointing at the circle, the nearest surface point and the depth
    let (face_normal, surface_point, depth) = if clamped != center {
        let delta = center - clamped;
        let dist_sq = delta.length_squared();
        if dist_sq > a.radius * a.radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        (delta / dist, clamped, a.radius - dist)
    } else {
        // centre inside the box, push out along the axis of least penetration
        let dx = half.x - center.x.abs();
        let dy = half.y - center.y.abs();
        if dx < dy {
            let sx = if center.x >= 0.0 { 1.0 } else { -1.0 };
            (
                Vec2::new(sx, 0.0),
                Vec2::new(sx * half.x, center.y),
                dx + a.radius,
            )
        } else {
            let sy = if center.y >= 0.0 { 1.0 } else { -1.0 };
            (
                Vec2::new(0.0, sy),
                Vec2::new(center.x, sy * half.y),
                dy + a.radius,
            )
        }
    };

    let face = box_face(face_normal);
    let corners = b.local_vertices();
    let normal = -xf_b.rotation.rotate(face_normal);

    Some(ContactManifold {
        normal,
        points: [xf_a.position + normal * a.radius, Vec2::ZERO],
        depths: [depth, 0.0],
        count: 1,
        contact_type: ContactType::EdgeB,
        feature: FeatureId::new(ShapeKind::Circle, ShapeKind::Box, 0, face as u8, false),
        ref_points: [corners[face], corners[(face + 1) % 4]],
        inc_points: [Vec2::ZERO; 2],
        local_normal: face_normal,
        local_point: surface_point,
        radius_a: a.radius,
        radius_b: 0.0,
    })
}

/// Separating axis test over the face normals of both boxes followed by edge clipping.
pub fn box_box(
    a: &ShapeBox,
    xf_a: &Transform,
    b: &ShapeBox,
    xf_b: &Transform,
) -> Option<ContactManifold> {
    let axes = [
        xf_a.rotation.x_axis(),
        xf_b.rotation.x_axis(),
        xf_a.rotation.y_axis(),
        xf_b.rotation.y_axis(),
    ];
    let ha = a.half_extents;
    let hb = b.half_extents;
    let extents_a = [
        xf_a.rotation.rotate(ha),
        xf_a.rotation.rotate(Vec2::new(ha.x, -ha.y)),
    ];
    let extents_b = [
        xf_b.rotation.rotate(hb),
        xf_b.rotation.rotate(Vec2::new(hb.x, -hb.y)),
    ];
    let delta = xf_b.position - xf_a.position;

    let mut min_overlap = f32::MAX;
    let mut min_axis = axes[0];
    for &axis in &axes {
        let project_a = extents_a[0].dot(axis).abs().max(extents_a[1].dot(axis).abs());
        let project_b = extents_b[0].dot(axis).abs().max(extents_b[1].dot(axis).abs());
        let overlap = project_a + project_b - delta.dot(axis).abs();
        if overlap < 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            min_axis = axis;
        }
    }

    let normal = if min_axis.dot(delta) >= 0.0 {
        min_axis
    } else {
        -min_axis
    };

    polygon_manifold(
        (ShapeKind::Box, ShapeKind::Box),
        &a.world_vertices(xf_a),
        xf_a,
        &b.world_vertices(xf_b),
        xf_b,
        normal,
    )
}

/// GJK and EPA give the normal and depth. The polygon face towards the circle is recorded for
/// warm starting and debug output.
pub fn circle_polygon(
    shape_a: &Shape,
    xf_a: &Transform,
    shape_b: &Shape,
    xf_b: &Transform,
) -> Option<ContactManifold> {
    let penetration = gjk::penetration(shape_a, xf_a, shape_b, xf_b)?;
    let normal = penetration.normal;
    let vertices = shape_b.world_vertices(xf_b)?;
    let edge = best_edge(&vertices, -normal);
    let support = shape_b.support(-normal, xf_b);
    let radius = shape_a.radius();

    Some(ContactManifold {
        normal,
        points: [xf_a.position + normal * radius, Vec2::ZERO],
        depths: [penetration.depth, 0.0],
        count: 1,
        contact_type: ContactType::EdgeB,
        feature: FeatureId::new(shape_a.kind(), shape_b.kind(), 0, edge.index as u8, false),
        ref_points: [
            xf_b.inv_transform_point(edge.start),
            xf_b.inv_transform_point(edge.end),
        ],
        inc_points: [Vec2::ZERO; 2],
        local_normal: xf_b.rotation.inv_rotate(-normal),
        local_point: xf_b.inv_transform_point(support),
        radius_a: radius,
        radius_b: 0.0,
    })
}

/// Box-polygon and polygon-polygon: GJK and EPA for the normal, then edge clipping.
pub fn polygon_polygon(
    shape_a: &Shape,
    xf_a: &Transform,
    shape_b: &Shape,
    xf_b: &Transform,
) -> Option<ContactManifold> {
    let penetration = gjk::penetration(shape_a, xf_a, shape_b, xf_b)?;
    let vertices_a = shape_a.world_vertices(xf_a)?;
    let vertices_b = shape_b.world_vertices(xf_b)?;
    polygon_manifold(
        (shape_a.kind(), shape_b.kind()),
        &vertices_a,
        xf_a,
        &vertices_b,
        xf_b,
        penetration.normal,
    )
}
