//! Camera for ray generation.

use tiny_math::{Camera, Ray, Vec2, Vec3};

/// Pinhole camera generating primary rays for a fixed image size.
///
/// Built from the shared orbit [`Camera`] so both pipelines see the scene
/// from the same place. The camera's model matrix is honoured by moving the
/// eye into the scene's untransformed space instead of moving the scene.
#[derive(Debug, Clone, Copy)]
pub struct PinholeCamera {
    pub width: u32,
    pub height: u32,
    center: Vec3,
    /// Top-left corner of pixel (0, 0) on the image plane.
    pixel00_corner: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
}

impl PinholeCamera {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        // Calculate viewport dimensions at unit distance
        let h = (camera.fov_y / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (width as f32 / height as f32);

        // Calculate camera basis vectors
        let w = (camera.position - camera.target).normalize();
        let u = camera.up.cross(w).normalize();
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;
        let viewport_upper_left = camera.position - w - viewport_u / 2.0 - viewport_v / 2.0;

        let to_scene = camera.model.inverse();
        let center = to_scene.transform_point3(camera.position);

        Self {
            width,
            height,
            center,
            pixel00_corner: to_scene.transform_point3(viewport_upper_left),
            pixel_delta_u: to_scene.transform_vector3(viewport_u / width as f32),
            pixel_delta_v: to_scene.transform_vector3(viewport_v / height as f32),
        }
    }

    /// Ray through pixel `(x, y)` at `offset` inside the pixel, where
    /// `(0.5, 0.5)` is the pixel center. Rows run top to bottom.
    pub fn generate_ray(&self, x: u32, y: u32, offset: Vec2) -> Ray {
        let pixel_sample = self.pixel00_corner
            + (x as f32 + offset.x) * self.pixel_delta_u
            + (y as f32 + offset.y) * self.pixel_delta_v;

        Ray::new(self.center, (pixel_sample - self.center).normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_math::Mat4;

    fn camera() -> Camera {
        Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0).with_fov_degrees(90.0)
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let pinhole = PinholeCamera::new(&camera(), 100, 100);
        let ray = pinhole.generate_ray(50, 50, Vec2::ZERO);

        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 5.0));
        assert!((ray.direction - -Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_corner_rays_span_field_of_view() {
        let pinhole = PinholeCamera::new(&camera(), 2, 2);

        // 90 degree fov: the top-left corner sits at 45 degrees on both axes.
        let top_left = pinhole.generate_ray(0, 0, Vec2::ZERO);
        assert!((top_left.direction - Vec3::new(-1.0, 1.0, -1.0).normalize()).length() < 1e-5);

        let bottom_right = pinhole.generate_ray(1, 1, Vec2::ONE);
        assert!((bottom_right.direction - Vec3::new(1.0, -1.0, -1.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn test_model_matrix_moves_eye() {
        let mut camera = camera();
        camera.model = Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0));
        let pinhole = PinholeCamera::new(&camera, 10, 10);

        let ray = pinhole.generate_ray(5, 5, Vec2::ZERO);
        assert!((ray.origin - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-5);
    }
}
