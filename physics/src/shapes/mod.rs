mod shape_box;
mod shape_circle;
mod shape_polygon;

use crate::{
    bounds::Bounds,
    error::{PhysicsError, PhysicsResult},
    math::Transform,
};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    ops::Deref,
    path::Path,
    sync::Arc,
};

pub use shape_box::ShapeBox;
pub use shape_circle::ShapeCircle;
pub use shape_polygon::ShapePolygon;

pub const MAX_POLYGON_VERTICES: usize = 8;

trait ShapeTrait {
    fn area(&self) -> f32;
    fn inertia(&self, density: f32) -> f32;
    fn bounds(&self, xf: &Transform) -> Bounds;
    fn support(&self, dir: Vec2, xf: &Transform) -> Vec2;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Box,
    Polygon,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle(ShapeCircle),
    Box(ShapeBox),
    Polygon(Arc<ShapePolygon>),
}

impl Default for Shape {
    fn default() -> Shape {
        Shape::Box(ShapeBox {
            half_extents: Vec2::splat(0.5),
        })
    }
}

fn check_dimension(value: f32) -> PhysicsResult<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidDimension(value))
    }
}

impl Shape {
    pub fn make_circle(radius: f32) -> PhysicsResult<Self> {
        let radius = check_dimension(radius)?;
        Ok(Shape::Circle(ShapeCircle { radius }))
    }

    pub fn make_box(half_extents: Vec2) -> PhysicsResult<Self> {
        check_dimension(half_extents.x)?;
        check_dimension(half_extents.y)?;
        Ok(Shape::Box(ShapeBox { half_extents }))
    }

    pub fn make_polygon(points: &[Vec2]) -> PhysicsResult<Self> {
        Ok(Shape::Polygon(Arc::new(ShapePolygon::new(points)?)))
    }

    fn shape_trait(&self) -> &dyn ShapeTrait {
        match self {
            Shape::Circle(data) => data,
            Shape::Box(data) => data,
            Shape::Polygon(data) => data.deref(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Box(_) => ShapeKind::Box,
            Shape::Polygon(_) => ShapeKind::Polygon,
        }
    }

    pub fn area(&self) -> f32 {
        self.shape_trait().area()
    }

    /// Moment of inertia about the body origin.
    pub fn inertia(&self, density: f32) -> f32 {
        self.shape_trait().inertia(density)
    }

    pub fn bounds(&self, xf: &Transform) -> Bounds {
        self.shape_trait().bounds(xf)
    }

    /// Furthest world space point of the shape along `dir`.
    pub fn support(&self, dir: Vec2, xf: &Transform) -> Vec2 {
        self.shape_trait().support(dir, xf)
    }

    /// Rounding radius, non-zero only for circles.
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Circle(circle) => circle.radius,
            _ => 0.0,
        }
    }

    /// World space outline of a box or polygon. Circles have none.
    pub fn world_vertices(&self, xf: &Transform) -> Option<Vertices> {
        match self {
            Shape::Circle(_) => None,
            Shape::Box(data) => Some(data.world_vertices(xf)),
            Shape::Polygon(data) => Some(data.world_vertices(xf)),
        }
    }
}

/// Fixed capacity vertex list, avoids allocating in the narrow phase.
#[derive(Copy, Clone, Debug)]
pub struct Vertices {
    points: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
}

impl FromIterator<Vec2> for Vertices {
    fn from_iter<I: IntoIterator<Item = Vec2>>(iter: I) -> Self {
        let mut vertices = Vertices {
            points: [Vec2::ZERO; MAX_POLYGON_VERTICES],
            count: 0,
        };
        for point in iter.into_iter().take(MAX_POLYGON_VERTICES) {
            vertices.points[vertices.count] = point;
            vertices.count += 1;
        }
        vertices
    }
}

impl Deref for Vertices {
    type Target = [Vec2];

    fn deref(&self) -> &[Vec2] {
        &self.points[..self.count]
    }
}

pub fn load_shape<P: AsRef<Path>>(path: P) -> PhysicsResult<Shape> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

pub fn save_shape<P: AsRef<Path>>(path: P, shape: &Shape) -> PhysicsResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, shape)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Vec2> {
        vec![
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
        ]
    }

    #[test]
    fn test_circle_mass_properties() {
        let circle = Shape::make_circle(2.0).unwrap();
        assert_relative_eq!(circle.area(), 4.0 * std::f32::consts::PI);
        // 1/2 m r^2
        let mass = circle.area() * 3.0;
        assert_relative_eq!(circle.inertia(3.0), 0.5 * mass * 4.0);
    }

    #[test]
    fn test_box_matches_polygon() {
        let cuboid = Shape::make_box(Vec2::ONE).unwrap();
        let polygon = Shape::make_polygon(&unit_square()).unwrap();
        assert_relative_eq!(cuboid.area(), 4.0);
        assert_relative_eq!(polygon.area(), 4.0);
        assert_relative_eq!(cuboid.inertia(1.0), 8.0 / 3.0);
        assert_relative_eq!(polygon.inertia(1.0), 8.0 / 3.0, epsilon = 1e-5);
        assert_relative_eq!(polygon.inertia(2.0), 16.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_clockwise_polygon_is_reversed() {
        let mut points = unit_square();
        points.reverse();
        let polygon = ShapePolygon::new(&points).unwrap();
        assert_eq!(polygon.vertices(), unit_square().as_slice());
    }

    #[test]
    fn test_invalid_polygons() {
        let too_few = [Vec2::ZERO, Vec2::X];
        assert!(matches!(
            Shape::make_polygon(&too_few),
            Err(PhysicsError::PolygonVertexCount { count: 2, .. })
        ));

        let too_many: Vec<Vec2> = (0..9)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 9.0;
                Vec2::new(angle.cos(), angle.sin())
            })
            .collect();
        assert!(matches!(
            Shape::make_polygon(&too_many),
            Err(PhysicsError::PolygonVertexCount { count: 9, .. })
        ));

        let dart = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, -1.0),
            Vec2::new(0.5, 0.0),
            Vec2::new(2.0, 1.0),
        ];
        assert!(matches!(
            Shape::make_polygon(&dart),
            Err(PhysicsError::NonConvexPolygon)
        ));

        let line = [Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)];
        assert!(matches!(
            Shape::make_polygon(&line),
            Err(PhysicsError::DegeneratePolygon)
        ));

        assert!(matches!(
            Shape::make_circle(0.0),
            Err(PhysicsError::InvalidDimension(_))
        ));
    }

    #[test]
    fn test_rotated_box_bounds() {
        let cuboid = Shape::make_box(Vec2::new(2.0, 1.0)).unwrap();
        let xf = Transform::new(Vec2::new(1.0, 1.0), std::f32::consts::FRAC_PI_2);
        let bounds = cuboid.bounds(&xf);
        assert!(bounds.mins.abs_diff_eq(Vec2::new(0.0, -1.0), 1e-5));
        assert!(bounds.maxs.abs_diff_eq(Vec2::new(2.0, 3.0), 1e-5));
    }

    #[test]
    fn test_support() {
        let polygon = Shape::make_polygon(&unit_square()).unwrap();
        let xf = Transform::new(Vec2::new(5.0, 0.0), 0.0);
        assert_eq!(polygon.support(Vec2::new(1.0, 0.1), &xf), Vec2::new(6.0, 1.0));

        let circle = Shape::make_circle(0.5).unwrap();
        assert!(circle
            .support(Vec2::new(0.0, -3.0), &xf)
            .abs_diff_eq(Vec2::new(5.0, -0.5), 1e-6));
    }

    #[test]
    fn test_save_and_load_polygon() {
        let path = std::env::temp_dir().join(format!("physics2d-shape-{}.json", std::process::id()));
        let shape = Shape::make_polygon(&unit_square()).unwrap();
        save_shape(&path, &shape).unwrap();
        let loaded = load_shape(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, shape);
    }

    #[test]
    fn test_load_rejects_invalid_polygon() {
        let json = r#"{"Polygon":[[0.0,0.0],[1.0,0.0]]}"#;
        assert!(serde_json::from_str::<Shape>(json).is_err());
    }
}
