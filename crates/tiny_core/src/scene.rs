//! Scene aggregate read by both pipelines.
//!
//! A scene is immutable once built: geometry, the spatial index over it and
//! the BSDF list, where shape `i` is shaded with BSDF `i`.

use tiny_math::{Aabb, Ray};

use crate::{Bsdf, Bvh, Mesh, SceneError, SpatialIndex, SurfaceInteraction};

/// A named piece of world-space geometry.
#[derive(Clone, Debug)]
pub struct Shape {
    pub name: String,
    pub mesh: Mesh,
}

impl Shape {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
        }
    }
}

/// Geometry, its spatial index and the parallel BSDF list.
pub struct Scene {
    shapes: Vec<Shape>,
    bsdfs: Vec<Bsdf>,
    index: Box<dyn SpatialIndex>,
}

impl Scene {
    /// Build a scene and a [`Bvh`] over its shapes.
    pub fn new(shapes: Vec<Shape>, bsdfs: Vec<Bsdf>) -> Result<Self, SceneError> {
        Self::validate(&shapes, &bsdfs)?;
        let bvh = Bvh::build(&shapes);
        log::info!(
            "Scene ready: {} shapes, {} triangles",
            shapes.len(),
            bvh.triangle_count()
        );
        Ok(Self {
            shapes,
            bsdfs,
            index: Box::new(bvh),
        })
    }

    /// Build a scene around a caller-supplied spatial index.
    ///
    /// The index must report `shape_id`s that address `shapes`.
    pub fn with_index(
        shapes: Vec<Shape>,
        bsdfs: Vec<Bsdf>,
        index: Box<dyn SpatialIndex>,
    ) -> Result<Self, SceneError> {
        Self::validate(&shapes, &bsdfs)?;
        Ok(Self {
            shapes,
            bsdfs,
            index,
        })
    }

    /// An empty scene: every ray misses.
    pub fn empty() -> Self {
        Self {
            shapes: Vec::new(),
            bsdfs: Vec::new(),
            index: Box::new(Bvh::build(&[])),
        }
    }

    fn validate(shapes: &[Shape], bsdfs: &[Bsdf]) -> Result<(), SceneError> {
        if shapes.len() != bsdfs.len() {
            return Err(SceneError::MaterialCountMismatch {
                shapes: shapes.len(),
                bsdfs: bsdfs.len(),
            });
        }
        for shape in shapes {
            shape
                .mesh
                .validate()
                .map_err(|reason| SceneError::InvalidMesh {
                    name: shape.name.clone(),
                    reason,
                })?;
        }
        Ok(())
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn bsdfs(&self) -> &[Bsdf] {
        &self.bsdfs
    }

    /// BSDF of shape `shape_id`.
    pub fn bsdf(&self, shape_id: usize) -> Option<&Bsdf> {
        self.bsdfs.get(shape_id)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Get total triangle count across all shapes.
    pub fn triangle_count(&self) -> usize {
        self.shapes.iter().map(|s| s.mesh.triangle_count()).sum()
    }

    /// World-space bounds of the scene geometry.
    pub fn bounds(&self) -> Aabb {
        self.index.bounds()
    }

    /// Nearest hit along `ray`, or `None` when the ray escapes.
    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction> {
        self.index.intersect(ray)
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("shapes", &self.shapes.len())
            .field("bsdfs", &self.bsdfs)
            .finish()
    }
}
