use crate::{
    math::{Transform, Vec2Ext},
    shapes::Shape,
};
use glam::Vec2;
use tracing::trace;

const GJK_MAX_ITERATIONS: usize = 32;
pub(crate) const EPA_MAX_ITERATIONS: usize = 30;
const EPA_TOLERANCE: f32 = 1e-4;

/// Minimum translation separating two overlapping shapes. The normal points from A to B.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Penetration {
    pub normal: Vec2,
    pub depth: f32,
}

/// Support point of the Minkowski difference A - B.
fn support(shape_a: &Shape, xf_a: &Transform, shape_b: &Shape, xf_b: &Transform, dir: Vec2) -> Vec2 {
    shape_a.support(dir, xf_a) - shape_b.support(-dir, xf_b)
}

/// Returns the enclosing simplex when the shapes overlap.
pub fn gjk_intersect(
    shape_a: &Shape,
    xf_a: &Transform,
    shape_b: &Shape,
    xf_b: &Transform,
) -> Option<[Vec2; 3]> {
    let mut dir = (xf_b.position - xf_a.position).normalize_or(Vec2::X);
    let mut simplex = [support(shape_a, xf_a, shape_b, xf_b, dir), Vec2::ZERO, Vec2::ZERO];
    let mut count = 1;
    dir = -simplex[0];

    for _ in 0..GJK_MAX_ITERATIONS {
        // the origin sits on the simplex, the shapes only touch
        if dir.length_squared() <= f32::EPSILON * f32::EPSILON {
            return None;
        }

        let a = support(shape_a, xf_a, shape_b, xf_b, dir);
        if a.dot(dir) < 0.0 {
            // found a separating direction
            return None;
        }
        simplex[count] = a;
        count += 1;

        if count == 2 {
            let ab = simplex[0] - a;
            let ao = -a;
            dir = ab.perp() * ab.perp_dot(ao);
            if dir.length_squared() <= f32::EPSILON * f32::EPSILON {
                // origin on the segment, either side builds an enclosing triangle
                dir = ab.perp();
            }
            continue;
        }

        let c = simplex[0];
        let b = simplex[1];
        let ab = b - a;
        let ac = c - a;
        let ao = -a;
        let cross = ac.perp_dot(ab);
        let ab_perp = Vec2::new(-cross * ab.y, cross * ab.x);
        let ac_perp = Vec2::new(cross * ac.y, -cross * ac.x);

        if ab_perp.dot(ao) > 0.0 {
            // origin is outside ab, drop c
            simplex[0] = b;
            simplex[1] = a;
            count = 2;
            dir = ab_perp;
        } else if ac_perp.dot(ao) > 0.0 {
            // origin is outside ac, drop b
            simplex[1] = a;
            count = 2;
            dir = ac_perp;
        } else {
            return Some(simplex);
        }
    }

    None
}

/// Expands the GJK simplex towards the boundary of the Minkowski difference to find the
/// penetration normal and depth. Fails when it does not converge within the iteration cap.
pub fn epa(
    shape_a: &Shape,
    xf_a: &Transform,
    shape_b: &Shape,
    xf_b: &Transform,
    simplex: [Vec2; 3],
) -> Option<Penetration> {
    expand_polytope(shape_a, xf_a, shape_b, xf_b, simplex, EPA_MAX_ITERATIONS)
}

/// [`epa`] with an explicit iteration cap.
pub(crate) fn expand_polytope(
    shape_a: &Shape,
    xf_a: &Transform,
    shape_b: &Shape,
    xf_b: &Transform,
    simplex: [Vec2; 3],
    max_iterations: usize,
) -> Option<Penetration> {
    let mut polytope = simplex.to_vec();

    for _ in 0..max_iterations {
        let centroid = polytope.iter().copied().sum::<Vec2>() / polytope.len() as f32;

        let mut min_distance = f32::MAX;
        let mut min_normal = Vec2::X;
        let mut min_index = 0;
        for i in 0..polytope.len() {
            let j = (i + 1) % polytope.len();
            let vi = polytope[i];
            let mut normal = (polytope[j] - vi).perp().normalize_or_zero();
            if normal == Vec2::ZERO {
                continue;
            }
            if normal.dot(vi - centroid) < 0.0 {
                normal = -normal;
            }
            let distance = normal.dot(vi);
            if distance < min_distance {
                min_distance = distance;
                min_normal = normal;
                min_index = j;
            }
        }

        let point = support(shape_a, xf_a, shape_b, xf_b, min_normal);
        if min_normal.dot(point) - min_distance <= EPA_TOLERANCE {
            return Some(Penetration {
                normal: min_normal,
                depth: min_distance,
            });
        }

        polytope.insert(min_index, point);
    }

    trace!("epa did not converge in {} iterations", max_iterations);
    None
}

pub fn penetration(
    shape_a: &Shape,
    xf_a: &Transform,
    shape_b: &Shape,
    xf_b: &Transform,
) -> Option<Penetration> {
    let simplex = gjk_intersect(shape_a, xf_a, shape_b, xf_b)?;
    epa(shape_a, xf_a, shape_b, xf_b, simplex)
}
