use super::{ShapeTrait, Vertices, MAX_POLYGON_VERTICES};
use crate::{
    bounds::Bounds,
    error::{PhysicsError, PhysicsResult},
    math::Transform,
};
use glam::Vec2;
use serde::{Deserialize, Serialize};

const LINEAR_EPSILON: f32 = 1e-6;

/// A convex polygon in body local space with vertices in counter clockwise order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec2>", into = "Vec<Vec2>")]
pub struct ShapePolygon {
    vertices: Vec<Vec2>,
    area: f32,
    // second moment of area about the body origin
    unit_inertia: f32,
}

impl ShapePolygon {
    /// Validates the outline and stores it counter clockwise. Clockwise input is reversed.
    pub fn new(points: &[Vec2]) -> PhysicsResult<Self> {
        let count = points.len();
        if !(3..=MAX_POLYGON_VERTICES).contains(&count) {
            return Err(PhysicsError::PolygonVertexCount {
                count,
                max: MAX_POLYGON_VERTICES,
            });
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(PhysicsError::DegeneratePolygon);
        }

        let mut vertices = points.to_vec();
        let twice_area: f32 = edges(&vertices).map(|(a, b)| a.perp_dot(b)).sum();
        if twice_area.abs() <= LINEAR_EPSILON {
            return Err(PhysicsError::DegeneratePolygon);
        }
        if twice_area < 0.0 {
            vertices.reverse();
        }

        if edges(&vertices).any(|(a, b)| (b - a).length_squared() <= LINEAR_EPSILON) {
            return Err(PhysicsError::DegeneratePolygon);
        }

        for i in 0..count {
            let v0 = vertices[i];
            let v1 = vertices[(i + 1) % count];
            let v2 = vertices[(i + 2) % count];
            if (v1 - v0).perp_dot(v2 - v1) < -LINEAR_EPSILON {
                return Err(PhysicsError::NonConvexPolygon);
            }
        }

        // triangle fan about the origin
        let mut area = 0.0;
        let mut unit_inertia = 0.0;
        for (a, b) in edges(&vertices) {
            let tri_area = 0.5 * a.perp_dot(b);
            area += tri_area;
            unit_inertia += tri_area * (a.dot(a) + a.dot(b) + b.dot(b)) / 6.0;
        }

        Ok(Self {
            vertices,
            area,
            unit_inertia,
        })
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn world_vertices(&self, xf: &Transform) -> Vertices {
        Vertices::from_iter(self.vertices.iter().map(|&v| xf.transform_point(v)))
    }
}

fn edges(vertices: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    let count = vertices.len();
    (0..count).map(move |i| (vertices[i], vertices[(i + 1) % count]))
}

impl TryFrom<Vec<Vec2>> for ShapePolygon {
    type Error = PhysicsError;

    fn try_from(points: Vec<Vec2>) -> Result<Self, Self::Error> {
        Self::new(&points)
    }
}

impl From<ShapePolygon> for Vec<Vec2> {
    fn from(polygon: ShapePolygon) -> Self {
        polygon.vertices
    }
}

impl ShapeTrait for ShapePolygon {
    fn area(&self) -> f32 {
        self.area
    }

    fn inertia(&self, density: f32) -> f32 {
        self.unit_inertia * density
    }

    fn bounds(&self, xf: &Transform) -> Bounds {
        Bounds::from_points(&self.world_vertices(xf))
    }

    fn support(&self, dir: Vec2, xf: &Transform) -> Vec2 {
        let local_dir = xf.rotation.inv_rotate(dir);
        let mut best = self.vertices[0];
        let mut best_dot = best.dot(local_dir);
        for &v in &self.vertices[1..] {
            let d = v.dot(local_dir);
            if d > best_dot {
                best = v;
                best_dot = d;
            }
        }
        xf.transform_point(best)
    }
}
