use glam::{Mat4, Vec3};

/// Orbit camera shared by both pipelines.
///
/// Controllers queue orbit/dolly input between frames; [`Camera::update`]
/// folds the pending input into the camera once per frame, and
/// [`Camera::matrices`] returns the derived matrices.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// World transform applied to the whole scene.
    pub model: Mat4,

    yaw: f32,
    pitch: f32,
    distance: f32,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_dolly: f32,
}

/// Keep the orbit away from the poles so `look_at` never degenerates.
const MAX_PITCH: f32 = 1.55;
const MIN_DISTANCE: f32 = 1e-3;

impl Camera {
    /// Create a new camera looking from `position` at `target`.
    pub fn new(position: Vec3, target: Vec3, aspect: f32) -> Self {
        let mut camera = Self {
            position,
            target,
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            aspect,
            near: 0.01,
            far: 1000.0,
            model: Mat4::IDENTITY,
            yaw: 0.0,
            pitch: 0.0,
            distance: 1.0,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_dolly: 0.0,
        };
        camera.sync_angles();
        camera
    }

    /// Builder-style field of view in degrees.
    pub fn with_fov_degrees(mut self, fov_y: f32) -> Self {
        self.fov_y = fov_y.to_radians();
        self
    }

    /// Recompute orbit angles from the current position/target.
    fn sync_angles(&mut self) {
        let offset = self.position - self.target;
        self.distance = offset.length().max(MIN_DISTANCE);
        self.yaw = offset.x.atan2(offset.z);
        self.pitch = (offset.y / self.distance).clamp(-1.0, 1.0).asin();
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Queue a rotation around the target (radians).
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.pending_yaw += delta_yaw;
        self.pending_pitch += delta_pitch;
    }

    /// Queue a move toward (negative) or away from (positive) the target,
    /// as a fraction of the current distance.
    pub fn dolly(&mut self, amount: f32) {
        self.pending_dolly += amount;
    }

    /// Apply queued input and recompute the camera position.
    pub fn update(&mut self) {
        if self.pending_yaw == 0.0 && self.pending_pitch == 0.0 && self.pending_dolly == 0.0 {
            return;
        }

        self.yaw += self.pending_yaw;
        self.pitch = (self.pitch + self.pending_pitch).clamp(-MAX_PITCH, MAX_PITCH);
        self.distance = (self.distance * (1.0 + self.pending_dolly)).max(MIN_DISTANCE);
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_dolly = 0.0;

        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let offset = Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch);
        self.position = self.target + offset * self.distance;
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get the projection matrix (camera → clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// `(projection, view, model)` for the current frame.
    pub fn matrices(&self) -> (Mat4, Mat4, Mat4) {
        (self.projection_matrix(), self.view_matrix(), self.model)
    }

    /// Update aspect ratio (e.g., on window resize)
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 16.0 / 9.0);

        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
        assert!((camera.distance() - 5.0).abs() < 1e-5);
        assert_eq!(camera.model, Mat4::IDENTITY);
    }

    #[test]
    fn test_update_without_input_keeps_position() {
        let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 1.0);
        camera.update();
        assert_eq!(camera.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);
        camera.orbit(std::f32::consts::FRAC_PI_2, 0.0);
        camera.update();

        assert!((camera.position.length() - 5.0).abs() < 1e-4);
        assert!((camera.position.x - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_dolly_scales_distance() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, 1.0);
        camera.dolly(-0.5);
        camera.update();

        assert!((camera.distance() - 2.0).abs() < 1e-4);
        assert!((camera.position.z - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_matrices() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);
        let (projection, view, model) = camera.matrices();

        assert_eq!(model, Mat4::IDENTITY);
        assert!(view.w_axis.z < 0.0);
        assert!(projection.x_axis.x != 0.0);
        // Target sits in front of the camera
        let p = view.transform_point3(Vec3::ZERO);
        assert!(p.z < 0.0);
    }
}
