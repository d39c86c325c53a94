use super::{ShapeTrait, Vertices};
use crate::{bounds::Bounds, math::Transform};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A rectangle centred on the body origin.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeBox {
    pub half_extents: Vec2,
}

impl ShapeBox {
    /// Corners in counter clockwise order, starting with the `(+x, +y)` corner.
    pub fn local_vertices(&self) -> [Vec2; 4] {
        let h = self.half_extents;
        [
            Vec2::new(h.x, h.y),
            Vec2::new(-h.x, h.y),
            Vec2::new(-h.x, -h.y),
            Vec2::new(h.x, -h.y),
        ]
    }

    pub fn world_vertices(&self, xf: &Transform) -> Vertices {
        Vertices::from_iter(self.local_vertices().iter().map(|&v| xf.transform_point(v)))
    }
}

impl ShapeTrait for ShapeBox {
    fn area(&self) -> f32 {
        4.0 * self.half_extents.x * self.half_extents.y
    }

    fn inertia(&self, density: f32) -> f32 {
        let h = self.half_extents;
        self.area() * density * h.length_squared() / 3.0
    }

    fn bounds(&self, xf: &Transform) -> Bounds {
        let c = xf.rotation.cos.abs();
        let s = xf.rotation.sin.abs();
        let h = self.half_extents;
        let extents = Vec2::new(c * h.x + s * h.y, s * h.x + c * h.y);
        Bounds::from_center_half_extents(xf.position, extents)
    }

    fn support(&self, dir: Vec2, xf: &Transform) -> Vec2 {
        let local_dir = xf.rotation.inv_rotate(dir);
        let h = self.half_extents;
        let local = Vec2::new(
            if local_dir.x >= 0.0 { h.x } else { -h.x },
            if local_dir.y >= 0.0 { h.y } else { -h.y },
        );
        xf.transform_point(local)
    }
}
