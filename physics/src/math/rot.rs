use glam::Vec2;

/// A 2D rotation stored as its cosine and sine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rot {
    pub cos: f32,
    pub sin: f32,
}

impl Rot {
    pub const IDENTITY: Self = Self { cos: 1.0, sin: 0.0 };

    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { cos, sin }
    }

    pub fn angle(&self) -> f32 {
        self.sin.atan2(self.cos)
    }

    /// The rotated local x axis.
    pub fn x_axis(&self) -> Vec2 {
        Vec2::new(self.cos, self.sin)
    }

    /// The rotated local y axis.
    pub fn y_axis(&self) -> Vec2 {
        Vec2::new(-self.sin, self.cos)
    }

    pub fn rotate(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.cos * v.x - self.sin * v.y, self.sin * v.x + self.cos * v.y)
    }

    pub fn inv_rotate(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.cos * v.x + self.sin * v.y, -self.sin * v.x + self.cos * v.y)
    }
}

impl Default for Rot {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position and rotation of a body.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub rotation: Rot,
}

impl Transform {
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self {
            position,
            rotation: Rot::from_angle(angle),
        }
    }

    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.position + self.rotation.rotate(local)
    }

    pub fn inv_transform_point(&self, world: Vec2) -> Vec2 {
        self.rotation.inv_rotate(world - self.position)
    }
}
