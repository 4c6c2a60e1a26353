//! Render pass lifecycle.
//!
//! A pass is created, initialized once against a [`Gpu`], rendered any
//! number of times and cleaned up once. [`RenderPassBase`] holds what every
//! pass shares (camera, light, program set, lifecycle state) and rejects
//! out-of-order calls with [`RenderError::Lifecycle`].

use std::fmt;

use tiny_core::config::LightDescription;
use tiny_math::{Camera, Mat4, Vec3};

use crate::{Gpu, ProgramId, RenderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Uninitialized,
    Initialized,
    CleanedUp,
    /// `init` failed; everything it created has been released.
    Failed,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassState::Uninitialized => "uninitialized",
            PassState::Initialized => "initialized",
            PassState::CleanedUp => "cleaned up",
            PassState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub intensity: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        LightDescription::default().into()
    }
}

impl From<LightDescription> for Light {
    fn from(desc: LightDescription) -> Self {
        Self {
            position: desc.position,
            intensity: desc.intensity,
        }
    }
}

/// Startup parameters handed to [`RenderPass::init`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassConfig {
    pub width: u32,
    pub height: u32,
    pub light: Light,
    pub clear_color: [f32; 4],
}

impl PassConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            light: Light::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = light;
        self
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Uniform values shared by every object drawn in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub normal_mat: Mat4,
    pub cam_pos: Vec3,
    pub light_pos: Vec3,
    pub light_intensity: Vec3,
}

/// State and behaviour common to all render passes.
#[derive(Debug, Clone)]
pub struct RenderPassBase {
    pub camera: Camera,
    light: Light,
    clear_color: [f32; 4],
    model_mat: Mat4,
    normal_mat: Mat4,
    programs: Vec<ProgramId>,
    state: PassState,
}

impl RenderPassBase {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            light: Light::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            model_mat: Mat4::IDENTITY,
            normal_mat: Mat4::IDENTITY,
            programs: Vec::new(),
            state: PassState::Uninitialized,
        }
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Fail with [`RenderError::Lifecycle`] unless the pass is in `expected`.
    pub fn ensure(&self, operation: &'static str, expected: PassState) -> Result<(), RenderError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RenderError::Lifecycle {
                operation,
                state: self.state,
            })
        }
    }

    /// Shared part of `init`: adopt the startup configuration.
    pub fn init(&mut self, config: &PassConfig) -> Result<(), RenderError> {
        self.ensure("init", PassState::Uninitialized)?;
        self.camera.set_aspect(config.aspect());
        self.light = config.light;
        self.clear_color = config.clear_color;
        self.set_model_matrix(Mat4::IDENTITY);
        Ok(())
    }

    /// Called by a pass once all of its resources exist.
    pub fn finish_init(&mut self) {
        self.state = PassState::Initialized;
    }

    /// Release the program set after a failed `init`.
    pub fn fail(&mut self, gpu: &mut dyn Gpu) {
        self.release_programs(gpu);
        self.state = PassState::Failed;
    }

    /// Shared part of `clean_up`: release the program set.
    pub fn clean_up(&mut self, gpu: &mut dyn Gpu) -> Result<(), RenderError> {
        self.ensure("clean up", PassState::Initialized)?;
        self.release_programs(gpu);
        self.state = PassState::CleanedUp;
        Ok(())
    }

    /// Shared per-frame hook, run after a pass has issued its draws.
    pub fn render(&mut self, gpu: &mut dyn Gpu) -> Result<(), RenderError> {
        gpu.finish_frame()
    }

    fn release_programs(&mut self, gpu: &mut dyn Gpu) {
        for program in self.programs.drain(..) {
            gpu.delete_program(program);
        }
    }

    pub fn add_program(&mut self, program: ProgramId) {
        self.programs.push(program);
    }

    pub fn programs(&self) -> &[ProgramId] {
        &self.programs
    }

    pub fn light(&self) -> Light {
        self.light
    }

    /// Lights may be edited between frames.
    pub fn light_mut(&mut self) -> &mut Light {
        &mut self.light
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Base object transform; the normal matrix follows it.
    pub fn set_model_matrix(&mut self, model: Mat4) {
        self.model_mat = model;
        self.normal_mat = model.inverse().transpose();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.camera.set_aspect(width as f32 / height as f32);
        }
    }

    /// Apply queued camera input and derive this frame's shared uniforms.
    pub fn frame_uniforms(&mut self) -> FrameUniforms {
        self.camera.update();
        let (projection, view, camera_model) = self.camera.matrices();

        let (model, normal_mat) = if camera_model == Mat4::IDENTITY {
            (self.model_mat, self.normal_mat)
        } else {
            let model = camera_model * self.model_mat;
            (model, model.inverse().transpose())
        };

        FrameUniforms {
            model,
            view,
            projection,
            normal_mat,
            cam_pos: self.camera.position,
            light_pos: self.light.position,
            light_intensity: self.light.intensity,
        }
    }
}

/// A real-time pass: `init` once, `render` every frame, `clean_up` once.
pub trait RenderPass {
    fn init(&mut self, gpu: &mut dyn Gpu, config: &PassConfig) -> Result<(), RenderError>;
    fn render(&mut self, gpu: &mut dyn Gpu) -> Result<(), RenderError>;
    fn clean_up(&mut self, gpu: &mut dyn Gpu) -> Result<(), RenderError>;

    fn base(&self) -> &RenderPassBase;
    fn base_mut(&mut self) -> &mut RenderPassBase;

    fn state(&self) -> PassState {
        self.base().state()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.base_mut().resize(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RenderPassBase {
        RenderPassBase::new(Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0))
    }

    #[test]
    fn test_init_adopts_config() {
        let mut base = base();
        let light = Light {
            position: Vec3::new(1.0, 2.0, 3.0),
            intensity: Vec3::splat(5.0),
        };
        base.init(&PassConfig::new(800, 400).with_light(light)).unwrap();

        assert_eq!(base.camera.aspect, 2.0);
        assert_eq!(base.light(), light);
        // Still uninitialized until the pass finishes creating resources.
        assert_eq!(base.state(), PassState::Uninitialized);
    }

    #[test]
    fn test_frame_uniforms() {
        let mut base = base();
        base.init(&PassConfig::new(100, 100)).unwrap();
        base.light_mut().position = Vec3::new(0.0, 4.0, 0.0);

        let frame = base.frame_uniforms();
        assert_eq!(frame.model, Mat4::IDENTITY);
        assert_eq!(frame.normal_mat, Mat4::IDENTITY);
        assert_eq!(frame.cam_pos, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(frame.light_pos, Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(frame.view, base.camera.view_matrix());
    }

    #[test]
    fn test_camera_model_feeds_normal_matrix() {
        let mut base = base();
        base.init(&PassConfig::new(100, 100)).unwrap();
        base.camera.model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));

        let frame = base.frame_uniforms();
        assert_eq!(frame.model, base.camera.model);
        let n = frame.normal_mat.transform_vector3(Vec3::X);
        assert!((n - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_init_twice_is_rejected() {
        let mut base = base();
        base.init(&PassConfig::new(10, 10)).unwrap();
        base.finish_init();

        let err = base.init(&PassConfig::new(10, 10)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Lifecycle {
                operation: "init",
                state: PassState::Initialized
            }
        ));
        assert_eq!(err.to_string(), "cannot init a render pass that is initialized");
    }
}
