//! Real-time rasterization for TinyRender.
//!
//! Render passes are written against the immediate-mode [`Gpu`] trait and
//! follow a strict `init` / `render` / `clean_up` lifecycle. [`SimplePass`]
//! draws every scene shape with a diffuse or Phong program. Two backends
//! implement [`Gpu`]: [`WgpuGpu`] renders to a window surface and
//! [`RecordingGpu`] records calls in memory.

pub mod error;
pub mod gpu;
pub mod pass;
pub mod recording;
pub mod shaders;
pub mod simple;
pub mod vertex;
pub mod wgpu_backend;

pub use error::RenderError;
pub use gpu::{
    BufferId, Capability, Gpu, ProgramId, UniformLocation, UniformValue, VertexArrayId,
};
pub use pass::{FrameUniforms, Light, PassConfig, PassState, RenderPass, RenderPassBase};
pub use recording::{DrawRecord, GpuCall, RecordingGpu};
pub use simple::{GlObject, ShaderVariant, ShadingModel, SimplePass};
pub use vertex::{flatten_mesh, Vertex};
pub use wgpu_backend::WgpuGpu;
