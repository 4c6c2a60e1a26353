//! Math types shared by the offline and real-time pipelines.
//!
//! Vectors and matrices come straight from glam; this crate adds the few
//! rendering-specific types on top of it.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod camera;
mod frame;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use camera::Camera;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::{Ray, RAY_EPSILON};
