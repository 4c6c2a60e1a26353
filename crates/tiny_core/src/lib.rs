//! TinyRender core - the scene both pipelines read from.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` triangle meshes and the `Shape`s built from them
//! - **Materials**: the closed `Bsdf` set (diffuse, Phong)
//! - **Ray queries**: the `SpatialIndex` contract, its `Bvh` implementation
//!   and the `SurfaceInteraction` a hit produces
//! - **Scene descriptions**: JSON scene files with OBJ geometry
//!
//! # Example
//!
//! ```ignore
//! use tiny_core::config::SceneDescription;
//!
//! let description = SceneDescription::from_file("cornell.json")?;
//! let scene = description.build()?;
//! println!("Loaded {} shapes", scene.shape_count());
//! ```

pub mod bsdf;
pub mod bvh;
pub mod config;
pub mod error;
pub mod interaction;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use bsdf::{Bsdf, Color};
pub use bvh::{Bvh, SpatialIndex};
pub use error::SceneError;
pub use interaction::SurfaceInteraction;
pub use mesh::Mesh;
pub use scene::{Scene, Shape};
