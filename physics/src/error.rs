use crate::body::BodyHandle;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("polygon needs between 3 and {max} vertices, got {count}")]
    PolygonVertexCount { count: usize, max: usize },
    #[error("polygon is not convex")]
    NonConvexPolygon,
    #[error("polygon is degenerate: zero area or coincident vertices")]
    DegeneratePolygon,
    #[error("shape dimension must be positive and finite, got {0}")]
    InvalidDimension(f32),
    #[error("body handle {0:?} does not refer to a live body")]
    InvalidBody(BodyHandle),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
