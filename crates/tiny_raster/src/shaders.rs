//! Built-in shader stages.
//!
//! Programs are assembled by name from one vertex and one fragment stage,
//! the way GL programs are linked from shader objects. Every stage declares
//! the uniforms it reads together with their byte offset inside the stage's
//! uniform block, mirroring the WGSL struct layout (vec3 fields are 16-byte
//! aligned, a trailing f32 may pack into the last vec3's padding).

use crate::RenderError;

/// Size of one uniform block slot. Matches the minimum dynamic offset
/// alignment every wgpu backend supports.
pub const UNIFORM_BLOCK_SIZE: u64 = 256;

/// Name of the shared vertex stage.
pub const SIMPLE_VERTEX_SHADER: &str = "simple.vert";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Vec3,
    F32,
}

impl UniformKind {
    /// Bytes written into the block (vec3 padding excluded).
    pub fn size(self) -> usize {
        match self {
            UniformKind::Mat4 => 64,
            UniformKind::Vec3 => 12,
            UniformKind::F32 => 4,
        }
    }
}

/// Which bind group a uniform lives in: group 0 for the vertex stage,
/// group 1 for the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlock {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
    pub block: UniformBlock,
    pub offset: usize,
}

const fn uniform(
    name: &'static str,
    kind: UniformKind,
    block: UniformBlock,
    offset: usize,
) -> UniformDecl {
    UniformDecl {
        name,
        kind,
        block,
        offset,
    }
}

/// A registered WGSL stage and the uniforms it reads.
#[derive(Debug)]
pub struct ShaderSource {
    pub name: &'static str,
    pub stage: ShaderStage,
    pub source: &'static str,
    pub uniforms: &'static [UniformDecl],
}

impl ShaderSource {
    pub fn entry_point(&self) -> &'static str {
        match self.stage {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

use UniformBlock::{Fragment as Frag, Vertex as Vert};
use UniformKind::{Mat4, Vec3, F32};

static SHADERS: &[ShaderSource] = &[
    ShaderSource {
        name: SIMPLE_VERTEX_SHADER,
        stage: ShaderStage::Vertex,
        source: include_str!("shaders/simple_vert.wgsl"),
        uniforms: &[
            uniform("model", Mat4, Vert, 0),
            uniform("view", Mat4, Vert, 64),
            uniform("projection", Mat4, Vert, 128),
            uniform("normal_mat", Mat4, Vert, 192),
        ],
    },
    ShaderSource {
        name: "diffuse.frag",
        stage: ShaderStage::Fragment,
        source: include_str!("shaders/diffuse_frag.wgsl"),
        uniforms: &[
            uniform("cam_pos", Vec3, Frag, 0),
            uniform("light_pos", Vec3, Frag, 16),
            uniform("light_intensity", Vec3, Frag, 32),
            uniform("albedo", Vec3, Frag, 48),
        ],
    },
    ShaderSource {
        name: "phong.frag",
        stage: ShaderStage::Fragment,
        source: include_str!("shaders/phong_frag.wgsl"),
        uniforms: &[
            uniform("cam_pos", Vec3, Frag, 0),
            uniform("light_pos", Vec3, Frag, 16),
            uniform("light_intensity", Vec3, Frag, 32),
            uniform("rho_d", Vec3, Frag, 48),
            uniform("rho_s", Vec3, Frag, 64),
            uniform("exponent", F32, Frag, 76),
        ],
    },
];

/// Look up a registered stage by name.
pub fn find_shader(name: &str) -> Result<&'static ShaderSource, RenderError> {
    SHADERS
        .iter()
        .find(|shader| shader.name == name)
        .ok_or_else(|| RenderError::ShaderNotFound(name.to_string()))
}

/// The stages of a program and its combined uniform table.
#[derive(Debug, Clone)]
pub struct ProgramLayout {
    pub vertex: &'static ShaderSource,
    pub fragment: &'static ShaderSource,
    pub uniforms: Vec<UniformDecl>,
}

impl ProgramLayout {
    pub fn label(&self) -> String {
        format!("{}+{}", self.vertex.name, self.fragment.name)
    }
}

/// Resolve and pair two stages into a program layout.
pub fn link(vertex: &str, fragment: &str) -> Result<ProgramLayout, RenderError> {
    let vs = find_shader(vertex)?;
    let fs = find_shader(fragment)?;

    let link_error = |reason: String| RenderError::Link {
        vertex: vertex.to_string(),
        fragment: fragment.to_string(),
        reason,
    };

    if vs.stage != ShaderStage::Vertex {
        return Err(link_error(format!("'{}' is not a vertex shader", vertex)));
    }
    if fs.stage != ShaderStage::Fragment {
        return Err(link_error(format!("'{}' is not a fragment shader", fragment)));
    }

    let uniforms: Vec<UniformDecl> = vs.uniforms.iter().chain(fs.uniforms).copied().collect();
    if let Some(clash) = vs
        .uniforms
        .iter()
        .find(|v| fs.uniforms.iter().any(|f| f.name == v.name))
    {
        return Err(link_error(format!(
            "uniform '{}' is declared by both stages",
            clash.name
        )));
    }

    Ok(ProgramLayout {
        vertex: vs,
        fragment: fs,
        uniforms,
    })
}
