use crate::error::PhysicsResult;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// When the world is allowed to stop simulating.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub enabled: bool,
    /// Linear speed below which a body counts as resting.
    pub linear_tolerance: f32,
    /// Angular speed below which a body counts as resting.
    pub angular_tolerance: f32,
    /// Resting steps before the world skips simulation.
    pub timer_threshold: u32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            linear_tolerance: 0.05,
            angular_tolerance: 0.05,
            timer_threshold: 20,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec2,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    /// Fraction of the penetration removed per position iteration.
    pub baumgarte: f32,
    /// Penetration allowed without correction.
    pub linear_slop: f32,
    pub max_linear_correction: f32,
    /// Scales the impulses carried over from the previous step.
    pub warm_start_scale: f32,
    /// Broad phase boxes are this much larger than the shape bounds.
    pub aabb_enlarge_factor: f32,
    pub sleep: SleepConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.8),
            velocity_iterations: 10,
            position_iterations: 6,
            baumgarte: 0.2,
            linear_slop: 0.05,
            max_linear_correction: 0.2,
            warm_start_scale: 1.0,
            aabb_enlarge_factor: 1.2,
            sleep: SleepConfig::default(),
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> PhysicsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> PhysicsResult<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> PhysicsResult<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
