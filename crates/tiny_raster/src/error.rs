use thiserror::Error;

use crate::{BufferId, PassState};

/// Errors raised by GPU backends and render passes.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("shader '{0}' is not registered")]
    ShaderNotFound(String),

    #[error("cannot link '{vertex}' with '{fragment}': {reason}")]
    Link {
        vertex: String,
        fragment: String,
        reason: String,
    },

    #[error("failed to compile program '{program}':\n{diagnostic}")]
    Compile { program: String, diagnostic: String },

    #[error("failed to upload geometry: {0}")]
    Upload(String),

    #[error("unknown vertex buffer {0:?}")]
    UnknownBuffer(BufferId),

    #[error("cannot {operation} a render pass that is {state}")]
    Lifecycle {
        operation: &'static str,
        state: PassState,
    },

    #[error("failed to find suitable GPU adapter")]
    NoAdapter,

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
