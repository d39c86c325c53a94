use glam::Vec2;

pub trait Vec2Ext {
    /// `w x self`, the velocity of a lever arm `self` spinning at `w` radians per second.
    fn cross_scalar(self, w: f32) -> Vec2;
    /// Normalizes, returning `fallback` for zero length or non-finite input.
    fn normalize_or(self, fallback: Vec2) -> Vec2;
}

impl Vec2Ext for Vec2 {
    #[inline]
    fn cross_scalar(self, w: f32) -> Vec2 {
        Vec2::new(-w * self.y, w * self.x)
    }

    #[inline]
    fn normalize_or(self, fallback: Vec2) -> Vec2 {
        let rcp = self.length_recip();
        if rcp.is_finite() && rcp > 0.0 {
            self * rcp
        } else {
            fallback
        }
    }
}

#[test]
fn test_cross_scalar() {
    let r = Vec2::new(1.0, 0.0);
    assert_eq!(r.cross_scalar(2.0), Vec2::new(0.0, 2.0));
    assert_eq!(Vec2::ZERO.normalize_or(Vec2::X), Vec2::X);
    assert_eq!(Vec2::new(0.0, 3.0).normalize_or(Vec2::X), Vec2::Y);
}
