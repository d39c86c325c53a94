pub mod body;
pub mod bounds;
pub mod broadphase;
pub mod config;
mod constraints;
pub mod contact;
pub mod error;
pub mod gjk;
pub mod intersect;
pub mod manifold;
pub mod math;
pub mod shapes;
pub mod world;

pub use body::{Body, BodyDesc, BodyHandle, BodyType};
pub use config::{SleepConfig, WorldConfig};
pub use contact::ContactView;
pub use error::{PhysicsError, PhysicsResult};
pub use shapes::Shape;
pub use world::{StepStatus, World};
