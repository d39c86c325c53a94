use super::ShapeTrait;
use crate::{bounds::Bounds, math::Transform};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A circle centred on the body origin.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeCircle {
    pub radius: f32,
}

impl ShapeTrait for ShapeCircle {
    fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }

    fn inertia(&self, density: f32) -> f32 {
        0.5 * self.area() * density * self.radius * self.radius
    }

    fn bounds(&self, xf: &Transform) -> Bounds {
        Bounds::from_center_half_extents(xf.position, Vec2::splat(self.radius))
    }

    fn support(&self, dir: Vec2, xf: &Transform) -> Vec2 {
        xf.position + dir.normalize_or_zero() * self.radius
    }
}
