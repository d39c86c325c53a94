mod contact_position;
mod contact_velocity;

pub(crate) use contact_position::solve_position_constraints;
pub(crate) use contact_velocity::{init_velocity_constraints, solve_velocity_constraints, warm_start};

use glam::Vec2;

/// Provisional centre and angle of a body during a step.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Position {
    pub c: Vec2,
    pub a: f32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Velocity {
    pub v: Vec2,
    pub w: f32,
}
