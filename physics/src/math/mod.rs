pub mod glam_ext;
mod lcp;
mod rot;

pub use glam_ext::Vec2Ext;
pub use lcp::solve_block_lcp;
pub use rot::{Rot, Transform};
