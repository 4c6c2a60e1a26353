//! The immediate-mode GPU contract render passes are written against.
//!
//! The calls mirror the small slice of OpenGL a forward pass needs: shader
//! programs, vertex buffers and vertex arrays, per-program uniform state,
//! a couple of capabilities and non-indexed triangle draws. Handles are
//! opaque and only meaningful to the backend that issued them.

use tiny_math::{Mat4, Vec3};

use crate::shaders::{ProgramLayout, UniformBlock, UniformDecl, UniformKind};
use crate::{RenderError, Vertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayId(pub(crate) u32);

/// A resolved uniform: the program it belongs to and its slot there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub(crate) program: ProgramId,
    pub(crate) index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec3(Vec3),
    F32(f32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::F32(_) => UniformKind::F32,
        }
    }

    fn write(&self, out: &mut [u8]) {
        match self {
            UniformValue::Mat4(m) => out.copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
            UniformValue::Vec3(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::F32(x) => out.copy_from_slice(bytemuck::bytes_of(x)),
        }
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        UniformValue::Mat4(m)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<f32> for UniformValue {
    fn from(x: f32) -> Self {
        UniformValue::F32(x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    /// Linear fragment output is encoded to sRGB on write.
    FramebufferSrgb,
}

/// Immediate-mode GPU interface.
///
/// Uniform state belongs to programs and persists across draws until it is
/// overwritten. `set_uniform` applies to the program in use; a `None`
/// location (a name the program does not declare) is silently ignored.
pub trait Gpu {
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId, RenderError>;
    fn delete_program(&mut self, program: ProgramId);

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<BufferId, RenderError>;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_vertex_array(&mut self, buffer: BufferId) -> Result<VertexArrayId, RenderError>;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);

    fn is_program(&self, program: ProgramId) -> bool;
    fn is_buffer(&self, buffer: BufferId) -> bool;
    fn is_vertex_array(&self, vertex_array: VertexArrayId) -> bool;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn use_program(&mut self, program: ProgramId);
    fn set_uniform(&mut self, location: Option<UniformLocation>, value: UniformValue);

    fn clear(&mut self, color: [f32; 4]);
    fn enable(&mut self, capability: Capability);
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);
    /// Draw `count` vertices of the bound vertex array as a triangle list.
    fn draw_triangles(&mut self, first: u32, count: u32);

    /// End of frame: submit the recorded work.
    fn finish_frame(&mut self) -> Result<(), RenderError>;
}

/// Per-program uniform storage shared by the backends.
#[derive(Debug, Clone)]
pub(crate) struct ProgramUniforms {
    decls: Vec<UniformDecl>,
    values: Vec<Option<UniformValue>>,
}

impl ProgramUniforms {
    pub(crate) fn new(layout: &ProgramLayout) -> Self {
        Self {
            decls: layout.uniforms.clone(),
            values: vec![None; layout.uniforms.len()],
        }
    }

    pub(crate) fn find(&self, name: &str) -> Option<usize> {
        self.decls.iter().position(|decl| decl.name == name)
    }

    /// Store a value; kind mismatches are dropped with a warning, as GL
    /// would reject them.
    pub(crate) fn set(&mut self, index: usize, value: UniformValue) -> Option<&'static str> {
        let decl = self.decls.get(index)?;
        if decl.kind != value.kind() {
            log::warn!(
                "Uniform '{}' is {:?}, ignoring {:?} value",
                decl.name,
                decl.kind,
                value.kind()
            );
            return None;
        }
        self.values[index] = Some(value);
        Some(decl.name)
    }

    /// Serialize one block; unset uniforms read as zero.
    pub(crate) fn write_block(&self, block: UniformBlock, out: &mut [u8]) {
        out.fill(0);
        for (decl, value) in self.decls.iter().zip(&self.values) {
            if let (true, Some(value)) = (decl.block == block, value) {
                value.write(&mut out[decl.offset..decl.offset + decl.kind.size()]);
            }
        }
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = (&'static str, UniformValue)> + '_ {
        self.decls
            .iter()
            .zip(&self.values)
            .filter_map(|(decl, value)| value.map(|v| (decl.name, v)))
    }
}
