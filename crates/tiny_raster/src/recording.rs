//! In-memory GPU backend.
//!
//! Records every call and keeps just enough state (live handles, bound
//! program and vertex array, per-program uniforms) to check what a pass
//! asked of the GPU. Nothing is drawn.

use std::collections::BTreeMap;

use crate::gpu::ProgramUniforms;
use crate::shaders::link;
use crate::{
    BufferId, Capability, Gpu, ProgramId, RenderError, UniformLocation, UniformValue,
    VertexArrayId, Vertex,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CompileProgram {
        program: ProgramId,
        vertex: String,
        fragment: String,
    },
    DeleteProgram(ProgramId),
    CreateVertexBuffer {
        buffer: BufferId,
        vertex_count: usize,
    },
    DeleteBuffer(BufferId),
    CreateVertexArray {
        vertex_array: VertexArrayId,
        buffer: BufferId,
    },
    DeleteVertexArray(VertexArrayId),
    UseProgram(ProgramId),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    Clear([f32; 4]),
    Enable(Capability),
    BindVertexArray(Option<VertexArrayId>),
    DrawTriangles {
        first: u32,
        count: u32,
    },
    FinishFrame,
}

/// Snapshot of the state a draw call saw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub fragment_shader: &'static str,
    pub vertex_array: VertexArrayId,
    pub first: u32,
    pub count: u32,
    /// Uniform names set since the program was last made current, in order.
    pub uniforms_set: Vec<String>,
    /// Every uniform value the program holds at draw time.
    pub uniforms: BTreeMap<String, UniformValue>,
    pub depth_test: bool,
    pub srgb: bool,
}

impl DrawRecord {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

struct RecordedProgram {
    fragment_shader: &'static str,
    uniforms: ProgramUniforms,
}

#[derive(Default)]
pub struct RecordingGpu {
    calls: Vec<GpuCall>,
    draws: Vec<DrawRecord>,
    frames: usize,

    programs: BTreeMap<ProgramId, RecordedProgram>,
    buffers: BTreeMap<BufferId, usize>,
    vertex_arrays: BTreeMap<VertexArrayId, BufferId>,
    next_id: u32,

    current_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
    uniforms_set: Vec<String>,
    depth_test: bool,
    srgb: bool,

    failing_shader: Option<String>,
    upload_budget: Option<usize>,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every program using the named stage fail to compile.
    pub fn with_failing_shader(mut self, name: impl Into<String>) -> Self {
        self.failing_shader = Some(name.into());
        self
    }

    /// Let `count` vertex buffer uploads succeed, then fail the rest.
    pub fn with_upload_limit(mut self, count: usize) -> Self {
        self.upload_budget = Some(count);
        self
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Number of finished frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Forget recorded calls and draws, keeping live state.
    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }

    fn next_handle(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl Gpu for RecordingGpu {
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError> {
        let layout = link(vertex, fragment)?;
        if let Some(failing) = &self.failing_shader {
            if failing == vertex || failing == fragment {
                return Err(RenderError::Compile {
                    program: layout.label(),
                    diagnostic: format!("{}: injected compile failure", failing),
                });
            }
        }

        let program = ProgramId(self.next_handle());
        self.programs.insert(
            program,
            RecordedProgram {
                fragment_shader: layout.fragment.name,
                uniforms: ProgramUniforms::new(&layout),
            },
        );
        self.calls.push(GpuCall::CompileProgram {
            program,
            vertex: vertex.to_string(),
            fragment: fragment.to_string(),
        });
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            log::warn!("Deleting unknown program {:?}", program);
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.calls.push(GpuCall::DeleteProgram(program));
    }

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferId, RenderError> {
        if vertices.is_empty() {
            return Err(RenderError::Upload("vertex data is empty".to_string()));
        }
        if let Some(budget) = self.upload_budget.as_mut() {
            if *budget == 0 {
                return Err(RenderError::Upload("out of memory (injected)".to_string()));
            }
            *budget -= 1;
        }

        let buffer = BufferId(self.next_handle());
        self.buffers.insert(buffer, vertices.len());
        self.calls.push(GpuCall::CreateVertexBuffer {
            buffer,
            vertex_count: vertices.len(),
        });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_none() {
            log::warn!("Deleting unknown buffer {:?}", buffer);
        }
        self.calls.push(GpuCall::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&mut self, buffer: BufferId) -> Result<VertexArrayId, RenderError> {
        if !self.buffers.contains_key(&buffer) {
            return Err(RenderError::UnknownBuffer(buffer));
        }
        let vertex_array = VertexArrayId(self.next_handle());
        self.vertex_arrays.insert(vertex_array, buffer);
        self.calls.push(GpuCall::CreateVertexArray {
            vertex_array,
            buffer,
        });
        Ok(vertex_array)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            log::warn!("Deleting unknown vertex array {:?}", vertex_array);
        }
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
        self.calls.push(GpuCall::DeleteVertexArray(vertex_array));
    }

    fn is_program(&self, program: ProgramId) -> bool {
        self.programs.contains_key(&program)
    }

    fn is_buffer(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    fn is_vertex_array(&self, vertex_array: VertexArrayId) -> bool {
        self.vertex_arrays.contains_key(&vertex_array)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let index = self.programs.get(&program)?.uniforms.find(name)?;
        Some(UniformLocation { program, index })
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = Some(program);
        self.uniforms_set.clear();
        self.calls.push(GpuCall::UseProgram(program));
    }

    fn set_uniform(&mut self, location: Option<UniformLocation>, value: UniformValue) {
        let Some(location) = location else {
            return;
        };
        if self.current_program != Some(location.program) {
            log::warn!("Uniform set on {:?}, which is not in use", location.program);
            return;
        }
        let Some(program) = self.programs.get_mut(&location.program) else {
            return;
        };
        if let Some(name) = program.uniforms.set(location.index, value) {
            self.uniforms_set.push(name.to_string());
            self.calls.push(GpuCall::SetUniform {
                program: location.program,
                name: name.to_string(),
                value,
            });
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(GpuCall::Clear(color));
    }

    fn enable(&mut self, capability: Capability) {
        match capability {
            Capability::DepthTest => self.depth_test = true,
            Capability::FramebufferSrgb => self.srgb = true,
        }
        self.calls.push(GpuCall::Enable(capability));
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.bound_vertex_array = vertex_array;
        self.calls.push(GpuCall::BindVertexArray(vertex_array));
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        self.calls.push(GpuCall::DrawTriangles { first, count });

        let (Some(program_id), Some(vertex_array)) = (self.current_program, self.bound_vertex_array)
        else {
            log::warn!("Draw without a program and vertex array bound");
            return;
        };
        let Some(program) = self.programs.get(&program_id) else {
            return;
        };

        self.draws.push(DrawRecord {
            program: program_id,
            fragment_shader: program.fragment_shader,
            vertex_array,
            first,
            count,
            uniforms_set: self.uniforms_set.clone(),
            uniforms: program
                .uniforms
                .values()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            depth_test: self.depth_test,
            srgb: self.srgb,
        });
    }

    fn finish_frame(&mut self) -> Result<(), RenderError> {
        self.frames += 1;
        self.calls.push(GpuCall::FinishFrame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::SIMPLE_VERTEX_SHADER;
    use tiny_math::Vec3;

    #[test]
    fn test_handles_are_tracked() {
        let mut gpu = RecordingGpu::new();
        let program = gpu.compile_program(SIMPLE_VERTEX_SHADER, "diffuse.frag").unwrap();
        let vertices = [Vertex {
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
        }; 3];
        let buffer = gpu.create_vertex_buffer(&vertices).unwrap();
        let vertex_array = gpu.create_vertex_array(buffer).unwrap();

        assert!(gpu.is_program(program));
        assert!(gpu.is_buffer(buffer));
        assert!(gpu.is_vertex_array(vertex_array));

        gpu.delete_vertex_array(vertex_array);
        gpu.delete_buffer(buffer);
        gpu.delete_program(program);
        assert!(!gpu.is_program(program));
        assert_eq!(gpu.live_buffers() + gpu.live_vertex_arrays(), 0);
    }

    #[test]
    fn test_uniform_location_lookup() {
        let mut gpu = RecordingGpu::new();
        let diffuse = gpu.compile_program(SIMPLE_VERTEX_SHADER, "diffuse.frag").unwrap();

        assert!(gpu.uniform_location(diffuse, "albedo").is_some());
        assert!(gpu.uniform_location(diffuse, "rho_s").is_none());

        // Unknown locations are silently ignored.
        gpu.use_program(diffuse);
        gpu.set_uniform(None, Vec3::ONE.into());
        assert_eq!(gpu.calls().len(), 2);
    }

    #[test]
    fn test_vertex_array_needs_live_buffer() {
        let mut gpu = RecordingGpu::new();
        let err = gpu.create_vertex_array(BufferId(99)).unwrap_err();
        assert!(matches!(err, RenderError::UnknownBuffer(BufferId(99))));
    }

    #[test]
    fn test_injected_failures() {
        let mut gpu = RecordingGpu::new()
            .with_failing_shader("phong.frag")
            .with_upload_limit(0);

        assert!(gpu.compile_program(SIMPLE_VERTEX_SHADER, "diffuse.frag").is_ok());
        let err = gpu.compile_program(SIMPLE_VERTEX_SHADER, "phong.frag").unwrap_err();
        assert!(matches!(err, RenderError::Compile { .. }));

        let vertices = [Vertex {
            position: [0.0; 3],
            normal: [0.0; 3],
        }];
        assert!(matches!(
            gpu.create_vertex_buffer(&vertices),
            Err(RenderError::Upload(_))
        ));
    }
}
