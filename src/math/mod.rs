//! Math utilities module
//!
//! Planar angle arithmetic and rigid rotations on top of glam's `DVec2`.

pub mod angle;
mod transform;

pub use angle::{in_limit, is_clockwise, normalize_angle, signed_angle};
pub use transform::{direction, heading, Rotation};

// Re-export the glam vector type used throughout the crate
pub use glam::DVec2;
