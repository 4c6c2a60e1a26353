//! Record of a ray/surface intersection.

use tiny_math::{Frame, Vec2, Vec3};

/// Everything an integrator needs to know about the nearest hit.
///
/// Produced by a [`SpatialIndex`](crate::SpatialIndex) query and consumed
/// within a single integrator call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInteraction {
    /// Hit point in world space.
    pub p: Vec3,
    /// Shading frame (interpolated vertex normal).
    pub frame_ns: Frame,
    /// Geometric frame (true face normal).
    pub frame_ng: Frame,
    /// Barycentric coordinates of the hit inside its triangle.
    pub uv: Vec2,
    /// Ray parameter of the hit.
    pub t: f32,
    /// Incoming direction (towards the ray origin) in the shading frame.
    pub wi: Vec3,
    pub shape_id: usize,
    /// Index into the scene's BSDF list.
    pub material_id: usize,
}
