use crate::{
    math::{Transform, Vec2Ext},
    shapes::ShapeKind,
};
use glam::Vec2;

/// Which body owns the reference geometry of a manifold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContactType {
    /// Two circles, resolved along the line between their centres.
    Circles,
    /// The reference edge belongs to body A.
    EdgeA,
    /// The reference edge belongs to body B.
    EdgeB,
}

impl ContactType {
    fn flip(self) -> Self {
        match self {
            ContactType::Circles => ContactType::Circles,
            ContactType::EdgeA => ContactType::EdgeB,
            ContactType::EdgeB => ContactType::EdgeA,
        }
    }
}

/// Packs the shape pair, the two edge indices and the operand order of a manifold. Two
/// manifolds with equal ids were generated by the same features.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeatureId(u32);

impl FeatureId {
    pub const INVALID: Self = Self(u32::MAX);

    pub fn new(kind_a: ShapeKind, kind_b: ShapeKind, edge_a: u8, edge_b: u8, flipped: bool) -> Self {
        let pair = kind_a as u8 * 3 + kind_b as u8;
        Self(u32::from_le_bytes([pair, edge_a, edge_b, flipped as u8]))
    }

    pub fn key(&self) -> u32 {
        self.0
    }

    fn flip(self) -> Self {
        if self == Self::INVALID {
            self
        } else {
            Self(self.0 ^ (1 << 24))
        }
    }
}

/// Contact geometry between two shapes.
///
/// `points` are world space at generation time. The local fields let the position solver
/// rebuild the manifold from moved transforms: `local_normal` and `local_point` describe the
/// reference plane in the reference body's frame and `inc_points` are the incident points in the
/// incident body's frame. For circle pairs the reference points hold the radii.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactManifold {
    /// Points from A to B.
    pub normal: Vec2,
    pub points: [Vec2; 2],
    pub depths: [f32; 2],
    pub count: usize,
    pub contact_type: ContactType,
    pub feature: FeatureId,
    pub ref_points: [Vec2; 2],
    pub inc_points: [Vec2; 2],
    pub local_normal: Vec2,
    pub local_point: Vec2,
    pub radius_a: f32,
    pub radius_b: f32,
}

impl Default for ContactManifold {
    fn default() -> Self {
        Self {
            normal: Vec2::X,
            points: [Vec2::ZERO; 2],
            depths: [0.0; 2],
            count: 0,
            contact_type: ContactType::Circles,
            feature: FeatureId::INVALID,
            ref_points: [Vec2::ZERO; 2],
            inc_points: [Vec2::ZERO; 2],
            local_normal: Vec2::X,
            local_point: Vec2::ZERO,
            radius_a: 0.0,
            radius_b: 0.0,
        }
    }
}

impl ContactManifold {
    /// Swaps the roles of A and B.
    pub fn flip(mut self) -> Self {
        self.normal = -self.normal;
        self.contact_type = self.contact_type.flip();
        self.feature = self.feature.flip();
        std::mem::swap(&mut self.radius_a, &mut self.radius_b);
        if self.contact_type == ContactType::Circles {
            self.ref_points.swap(0, 1);
        }
        self
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points[..self.count]
    }

    pub fn depths(&self) -> &[f32] {
        &self.depths[..self.count]
    }
}

/// The edge of a polygon that best faces a direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct SupportEdge {
    pub start: Vec2,
    pub end: Vec2,
    /// Index of `start` in the polygon.
    pub index: usize,
}

impl SupportEdge {
    fn direction(&self) -> Vec2 {
        (self.end - self.start).normalize_or_zero()
    }
}

/// Finds the vertex furthest along `normal`, then picks whichever adjacent edge is closer to
/// perpendicular to `normal`. Vertices are counter clockwise so the edge keeps that winding.
pub(crate) fn best_edge(vertices: &[Vec2], normal: Vec2) -> SupportEdge {
    let count = vertices.len();
    let mut max_index = 0;
    let mut max_dot = f32::MIN;
    for (i, v) in vertices.iter().enumerate() {
        let d = v.dot(normal);
        if d > max_dot {
            max_dot = d;
            max_index = i;
        }
    }

    let prev = (max_index + count - 1) % count;
    let next = (max_index + 1) % count;
    let extreme = vertices[max_index];
    let to_next = (extreme - vertices[next]).normalize_or_zero();
    let to_prev = (extreme - vertices[prev]).normalize_or_zero();

    if to_prev.dot(normal) <= to_next.dot(normal) {
        SupportEdge {
            start: vertices[prev],
            end: extreme,
            index: prev,
        }
    } else {
        SupportEdge {
            start: extreme,
            end: vertices[next],
            index: max_index,
        }
    }
}

/// Keeps the part of a segment on the positive side of the plane `n . p = offset`.
fn clip_segment(points: [Vec2; 2], n: Vec2, offset: f32) -> Option<[Vec2; 2]> {
    let d0 = n.dot(points[0]) - offset;
    let d1 = n.dot(points[1]) - offset;

    let mut clipped = [Vec2::ZERO; 2];
    let mut count = 0;
    if d0 >= 0.0 {
        clipped[count] = points[0];
        count += 1;
    }
    if d1 >= 0.0 {
        clipped[count] = points[1];
        count += 1;
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        clipped[count] = points[0] + (points[1] - points[0]) * t;
        count += 1;
    }

    if count < 2 {
        None
    } else {
        Some(clipped)
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct ClippedPoints {
    pub points: [Vec2; 2],
    pub depths: [f32; 2],
    pub count: usize,
    /// True when the reference edge came from B.
    pub flipped: bool,
}

/// Clips the incident edge against the side planes of the reference edge, which is the flatter
/// of the two relative to `normal`. Points in front of the reference face are dropped.
pub(crate) fn clip(normal: Vec2, edge_a: &SupportEdge, edge_b: &SupportEdge) -> Option<ClippedPoints> {
    let flipped = edge_a.direction().dot(normal).abs() > edge_b.direction().dot(normal).abs();
    let (reference, incident) = if flipped {
        (edge_b, edge_a)
    } else {
        (edge_a, edge_b)
    };

    let ref_dir = reference.direction();
    let points = clip_segment(
        [incident.start, incident.end],
        ref_dir,
        ref_dir.dot(reference.start),
    )?;
    let points = clip_segment(points, -ref_dir, -ref_dir.dot(reference.end))?;

    // counter clockwise winding puts the outward normal on the right of the edge
    let outward = Vec2::new(ref_dir.y, -ref_dir.x);
    let face_offset = outward.dot(reference.start);

    let mut clipped = ClippedPoints {
        points: [Vec2::ZERO; 2],
        depths: [0.0; 2],
        count: 0,
        flipped,
    };
    for point in points {
        let depth = face_offset - outward.dot(point);
        if depth >= 0.0 {
            clipped.points[clipped.count] = point;
            clipped.depths[clipped.count] = depth;
            clipped.count += 1;
        }
    }

    if clipped.count == 0 {
        None
    } else {
        Some(clipped)
    }
}

/// Builds an edge manifold for two polygons given the collision normal from A to B.
pub(crate) fn polygon_manifold(
    kinds: (ShapeKind, ShapeKind),
    vertices_a: &[Vec2],
    xf_a: &Transform,
    vertices_b: &[Vec2],
    xf_b: &Transform,
    normal: Vec2,
) -> Option<ContactManifold> {
    let edge_a = best_edge(vertices_a, normal);
    let edge_b = best_edge(vertices_b, -normal);
    let clipped = clip(normal, &edge_a, &edge_b)?;

    let (contact_type, reference, xf_ref, xf_inc) = if clipped.flipped {
        (ContactType::EdgeB, &edge_b, xf_b, xf_a)
    } else {
        (ContactType::EdgeA, &edge_a, xf_a, xf_b)
    };

    let ref_dir = reference.direction();
    let face_normal = Vec2::new(ref_dir.y, -ref_dir.x).normalize_or(normal);
    let normal = match contact_type {
        ContactType::EdgeB => -face_normal,
        _ => face_normal,
    };

    let ref_start = xf_ref.inv_transform_point(reference.start);
    let ref_end = xf_ref.inv_transform_point(reference.end);
    let mut inc_points = [Vec2::ZERO; 2];
    for (local, &point) in inc_points.iter_mut().zip(&clipped.points[..clipped.count]) {
        *local = xf_inc.inv_transform_point(point);
    }

    Some(ContactManifold {
        normal,
        points: clipped.points,
        depths: clipped.depths,
        count: clipped.count,
        contact_type,
        feature: FeatureId::new(
            kinds.0,
            kinds.1,
            edge_a.index as u8,
            edge_b.index as u8,
            clipped.flipped,
        ),
        ref_points: [ref_start, ref_end],
        inc_points,
        local_normal: xf_ref.rotation.inv_rotate(face_normal),
        local_point: ref_start,
        radius_a: 0.0,
        radius_b: 0.0,
    })
}
