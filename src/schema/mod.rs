//! Schema module - Keyframe records, transforms and configuration types.

mod config;
mod keyframe;
mod transform;

pub use config::*;
pub use keyframe::*;
pub use transform::*;
