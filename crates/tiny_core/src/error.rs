//! Errors raised while building or loading a scene.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scene description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load OBJ {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("scene has {shapes} shapes but {bsdfs} BSDFs; the lists must be parallel")]
    MaterialCountMismatch { shapes: usize, bsdfs: usize },

    #[error("shape '{name}' has an invalid mesh: {reason}")]
    InvalidMesh { name: String, reason: String },
}
