use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Axis aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub mins: Vec2,
    pub maxs: Vec2,
}

impl Bounds {
    /// Returns an inverted box that any point expands.
    pub fn new() -> Bounds {
        Bounds {
            mins: Vec2::splat(f32::MAX),
            maxs: Vec2::splat(-f32::MAX),
        }
    }

    pub fn from_min_max(mins: Vec2, maxs: Vec2) -> Self {
        Bounds { mins, maxs }
    }

    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Bounds {
            mins: center - half_extents,
            maxs: center + half_extents,
        }
    }

    pub fn from_points(pts: &[Vec2]) -> Self {
        pts.iter().fold(Bounds::new(), |acc, pt| acc + *pt)
    }

    pub fn expand_by_point(&mut self, pt: Vec2) {
        self.add_assign(pt);
    }

    pub fn width(&self) -> Vec2 {
        self.maxs - self.mins
    }

    pub fn center(&self) -> Vec2 {
        (self.mins + self.maxs) * 0.5
    }

    /// Width times height. This is the cost metric of the broad phase tree.
    pub fn area(&self) -> f32 {
        let width = self.width();
        width.x * width.y
    }

    /// Smallest box enclosing both boxes.
    pub fn union(&self, rhs: &Self) -> Self {
        Bounds {
            mins: self.mins.min(rhs.mins),
            maxs: self.maxs.max(rhs.maxs),
        }
    }

    pub fn union_area(&self, rhs: &Self) -> f32 {
        self.union(rhs).area()
    }

    /// Scales the box about its center.
    pub fn enlarged(&self, factor: f32) -> Self {
        let half = self.width() * (0.5 * factor);
        Self::from_center_half_extents(self.center(), half)
    }

    /// True when `self` lies entirely inside `outer` (shared faces count as inside).
    pub fn is_inside(&self, outer: &Self) -> bool {
        self.mins.cmpge(outer.mins).all() && self.maxs.cmple(outer.maxs).all()
    }

    /// Touching boxes overlap.
    pub fn overlaps(&self, rhs: &Self) -> bool {
        !(self.maxs.cmplt(rhs.mins).any() || rhs.maxs.cmplt(self.mins).any())
    }
}

impl Default for Bounds {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Add<Vec2> for Bounds {
    type Output = Self;
    fn add(self, pt: Vec2) -> Self::Output {
        Bounds {
            mins: Vec2::select(pt.cmplt(self.mins), pt, self.mins),
            maxs: Vec2::select(pt.cmpgt(self.maxs), pt, self.maxs),
        }
    }
}

impl AddAssign<Vec2> for Bounds {
    fn add_assign(&mut self, pt: Vec2) {
        self.mins = Vec2::select(pt.cmplt(self.mins), pt, self.mins);
        self.maxs = Vec2::select(pt.cmpgt(self.maxs), pt, self.maxs);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points() {
        let bounds = Bounds::from_points(&[
            Vec2::new(1.0, -2.0),
            Vec2::new(-3.0, 4.0),
            Vec2::new(0.5, 0.5),
        ]);
        assert_eq!(bounds.mins, Vec2::new(-3.0, -2.0));
        assert_eq!(bounds.maxs, Vec2::new(1.0, 4.0));
        assert_relative_eq!(bounds.area(), 24.0);
    }

    #[test]
    fn test_union_and_enlarge() {
        let a = Bounds::from_min_max(Vec2::ZERO, Vec2::ONE);
        let b = Bounds::from_min_max(Vec2::new(2.0, 0.0), Vec2::new(3.0, 2.0));
        assert_relative_eq!(a.union_area(&b), 6.0);

        let fat = a.enlarged(1.2);
        assert!(fat.mins.abs_diff_eq(Vec2::splat(-0.1), 1e-6));
        assert!(fat.maxs.abs_diff_eq(Vec2::splat(1.1), 1e-6));
        assert!(a.is_inside(&fat));
        assert!(!fat.is_inside(&a));
        assert!(a.is_inside(&a));
    }

    #[test]
    fn test_overlaps() {
        let a = Bounds::from_min_max(Vec2::ZERO, Vec2::ONE);
        let touching = Bounds::from_min_max(Vec2::new(1.0, 0.5), Vec2::new(2.0, 2.0));
        let apart = Bounds::from_min_max(Vec2::new(1.5, 0.0), Vec2::new(2.0, 1.0));
        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
        assert!(!a.overlaps(&apart));
    }
}
