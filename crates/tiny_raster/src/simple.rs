//! Forward pass drawing every scene shape with a single point light.

use tiny_core::{Bsdf, Scene};
use tiny_math::{Camera, Vec3};

use crate::pass::FrameUniforms;
use crate::shaders::SIMPLE_VERTEX_SHADER;
use crate::vertex::flatten_mesh;
use crate::{
    BufferId, Capability, Gpu, PassConfig, PassState, ProgramId, RenderError, RenderPass,
    RenderPassBase, UniformValue, VertexArrayId,
};

/// GPU program variants, one per shading model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderVariant {
    Diffuse = 0,
    Phong = 1,
}

impl ShaderVariant {
    /// Every variant, in program-set order.
    pub const ALL: [ShaderVariant; 2] = [ShaderVariant::Diffuse, ShaderVariant::Phong];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn fragment_shader(self) -> &'static str {
        match self {
            ShaderVariant::Diffuse => "diffuse.frag",
            ShaderVariant::Phong => "phong.frag",
        }
    }
}

/// Material parameters of a drawable, tagged by the variant that shades it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadingModel {
    Diffuse {
        albedo: Vec3,
    },
    Phong {
        rho_d: Vec3,
        rho_s: Vec3,
        exponent: f32,
    },
}

impl ShadingModel {
    pub fn variant(&self) -> ShaderVariant {
        match self {
            ShadingModel::Diffuse { .. } => ShaderVariant::Diffuse,
            ShadingModel::Phong { .. } => ShaderVariant::Phong,
        }
    }

    /// Bind this variant's material uniforms, and only those.
    fn bind(&self, gpu: &mut dyn Gpu, program: ProgramId) {
        match *self {
            ShadingModel::Diffuse { albedo } => {
                gpu.set_uniform(gpu.uniform_location(program, "albedo"), albedo.into());
            }
            ShadingModel::Phong {
                rho_d,
                rho_s,
                exponent,
            } => {
                gpu.set_uniform(gpu.uniform_location(program, "rho_d"), rho_d.into());
                gpu.set_uniform(gpu.uniform_location(program, "rho_s"), rho_s.into());
                gpu.set_uniform(gpu.uniform_location(program, "exponent"), exponent.into());
            }
        }
    }
}

impl From<&Bsdf> for ShadingModel {
    fn from(bsdf: &Bsdf) -> Self {
        match *bsdf {
            Bsdf::Diffuse { albedo } => ShadingModel::Diffuse { albedo },
            Bsdf::Phong {
                rho_d,
                rho_s,
                exponent,
            } => ShadingModel::Phong {
                rho_d,
                rho_s,
                exponent,
            },
        }
    }
}

/// GPU-side record of one scene shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlObject {
    pub vao: VertexArrayId,
    pub vbo: BufferId,
    pub vertex_count: u32,
    pub program: ProgramId,
    pub material: ShadingModel,
}

/// Draws the scene with one diffuse or Phong program per shape.
pub struct SimplePass<'s> {
    base: RenderPassBase,
    scene: &'s Scene,
    objects: Vec<GlObject>,
}

impl<'s> SimplePass<'s> {
    pub fn new(scene: &'s Scene, camera: Camera) -> Self {
        Self {
            base: RenderPassBase::new(camera),
            scene,
            objects: Vec::new(),
        }
    }

    /// Drawables in scene order, one per shape once initialized.
    pub fn objects(&self) -> &[GlObject] {
        &self.objects
    }

    fn create_resources(&mut self, gpu: &mut dyn Gpu) -> Result<(), RenderError> {
        for variant in ShaderVariant::ALL {
            let program = gpu.compile_program(SIMPLE_VERTEX_SHADER, variant.fragment_shader())?;
            self.base.add_program(program);
        }

        let scene = self.scene;
        for (shape, bsdf) in scene.shapes().iter().zip(scene.bsdfs()) {
            let vertices = flatten_mesh(&shape.mesh);
            let vbo = gpu.create_vertex_buffer(&vertices)?;
            let vao = match gpu.create_vertex_array(vbo) {
                Ok(vao) => vao,
                Err(e) => {
                    gpu.delete_buffer(vbo);
                    return Err(e);
                }
            };

            let material = ShadingModel::from(bsdf);
            let variant = material.variant();
            let program = self.base.programs()[variant.index()];
            log::debug!(
                "Shape '{}': {} vertices, {:?} program",
                shape.name,
                vertices.len(),
                variant
            );

            self.objects.push(GlObject {
                vao,
                vbo,
                vertex_count: vertices.len() as u32,
                program,
                material,
            });
        }

        Ok(())
    }

    fn release_objects(&mut self, gpu: &mut dyn Gpu) {
        for object in self.objects.drain(..) {
            gpu.delete_vertex_array(object.vao);
            gpu.delete_buffer(object.vbo);
        }
    }
}

fn bind_frame_uniforms(gpu: &mut dyn Gpu, program: ProgramId, frame: &FrameUniforms) {
    let values: [(&str, UniformValue); 7] = [
        ("model", frame.model.into()),
        ("view", frame.view.into()),
        ("projection", frame.projection.into()),
        ("normal_mat", frame.normal_mat.into()),
        ("cam_pos", frame.cam_pos.into()),
        ("light_pos", frame.light_pos.into()),
        ("light_intensity", frame.light_intensity.into()),
    ];
    for (name, value) in values {
        gpu.set_uniform(gpu.uniform_location(program, name), value);
    }
}

impl RenderPass for SimplePass<'_> {
    fn init(&mut self, gpu: &mut dyn Gpu, config: &PassConfig) -> Result<(), RenderError> {
        self.base.init(config)?;

        if let Err(e) = self.create_resources(gpu) {
            log::error!("SimplePass init failed: {}", e);
            self.release_objects(gpu);
            self.base.fail(gpu);
            return Err(e);
        }

        self.base.finish_init();
        log::info!(
            "SimplePass initialized: {} objects, {} programs",
            self.objects.len(),
            self.base.programs().len()
        );
        Ok(())
    }

    fn render(&mut self, gpu: &mut dyn Gpu) -> Result<(), RenderError> {
        self.base.ensure("render", PassState::Initialized)?;

        gpu.clear(self.base.clear_color());
        gpu.enable(Capability::DepthTest);
        gpu.enable(Capability::FramebufferSrgb);

        let frame = self.base.frame_uniforms();

        for object in &self.objects {
            gpu.use_program(object.program);
            bind_frame_uniforms(gpu, object.program, &frame);
            object.material.bind(gpu, object.program);

            gpu.bind_vertex_array(Some(object.vao));
            gpu.draw_triangles(0, object.vertex_count);
            gpu.bind_vertex_array(None);
        }

        self.base.render(gpu)
    }

    fn clean_up(&mut self, gpu: &mut dyn Gpu) -> Result<(), RenderError> {
        self.base.ensure("clean up", PassState::Initialized)?;
        self.release_objects(gpu);
        self.base.clean_up(gpu)?;
        log::info!("SimplePass cleaned up");
        Ok(())
    }

    fn base(&self) -> &RenderPassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RenderPassBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shading_model_from_bsdf() {
        let diffuse = ShadingModel::from(&Bsdf::diffuse(Vec3::new(0.8, 0.2, 0.2)));
        assert_eq!(diffuse.variant(), ShaderVariant::Diffuse);

        let phong = ShadingModel::from(&Bsdf::phong(Vec3::splat(0.1), Vec3::ONE, 20.0));
        assert_eq!(phong.variant(), ShaderVariant::Phong);
        assert!(matches!(phong, ShadingModel::Phong { exponent, .. } if exponent == 20.0));
    }

    #[test]
    fn test_variant_indices() {
        for (i, variant) in ShaderVariant::ALL.iter().enumerate() {
            assert_eq!(variant.index(), i);
        }
        assert_eq!(ShaderVariant::Phong.fragment_shader(), "phong.frag");
    }
}
