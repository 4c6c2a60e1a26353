use crate::{Interval, Vec3};

/// Lower bound of a fresh ray's parametric interval, keeps secondary rays
/// from re-hitting the surface they start on.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray with origin, direction and the parametric interval it is valid on.
///
/// Rays are immutable once built; narrowing the interval produces a new ray.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Not necessarily normalized.
    pub direction: Vec3,
    pub t: Interval,
}

impl Ray {
    /// Create a ray valid on `[RAY_EPSILON, +inf)`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::with_interval(origin, direction, Interval::new(RAY_EPSILON, f32::INFINITY))
    }

    pub fn with_interval(origin: Vec3, direction: Vec3, t: Interval) -> Self {
        Self {
            origin,
            direction,
            t,
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_default_interval() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.t.min, RAY_EPSILON);
        assert!(ray.t.max.is_infinite());
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_with_interval() {
        let ray = Ray::with_interval(Vec3::ZERO, Vec3::Y, Interval::new(1.0, 2.0));
        assert!(!ray.t.contains(0.5));
        assert!(ray.t.contains(1.5));
    }
}
