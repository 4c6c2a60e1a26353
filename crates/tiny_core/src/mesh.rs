//! Triangle mesh geometry.
//!
//! Meshes are GPU-agnostic: the ray tracer builds its BVH from them and the
//! rasterizer flattens them into vertex buffers.

use tiny_math::{Aabb, Mat3, Mat4, Vec3};

/// A mesh consisting of vertex positions, optional normals, and triangle indices.
///
/// Triangles use counter-clockwise winding, so `(p1 - p0) x (p2 - p0)` is the
/// outward face normal.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - face normals are used when absent)
    pub normals: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::from_point_set(&positions);
        Self {
            positions,
            normals,
            indices,
            bounds,
        }
    }

    /// Two-triangle square spanning `[-1, 1]` in X and Y, facing +Z.
    pub fn quad() -> Self {
        let positions = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        let normals = vec![Vec3::Z; 4];
        Self::new(positions, vec![0, 1, 2, 0, 2, 3], Some(normals))
    }

    /// Cube spanning `[-1, 1]` on every axis, with flat per-face normals.
    pub fn cube() -> Self {
        let faces = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z];
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for n in faces {
            // Two axes spanning the face, ordered so the winding faces `n`.
            let u = if n.x.abs() > 0.5 { Vec3::Y } else { Vec3::X };
            let v = n.cross(u);
            let base = positions.len() as u32;
            for (a, b) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push(n + u * a + v * b);
                normals.push(n);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, indices, Some(normals))
    }

    /// Unit sphere tessellated into `segments` slices and `rings` stacks.
    pub fn uv_sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut positions = Vec::new();

        for ring in 0..=rings {
            let theta = std::f32::consts::PI * ring as f32 / rings as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            for segment in 0..=segments {
                let phi = std::f32::consts::TAU * segment as f32 / segments as f32;
                let (sin_phi, cos_phi) = phi.sin_cos();
                positions.push(Vec3::new(sin_theta * cos_phi, cos_theta, -sin_theta * sin_phi));
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::new();
        for ring in 0..rings {
            for segment in 0..segments {
                let i0 = ring * stride + segment;
                let i1 = i0 + stride;
                if ring != 0 {
                    indices.extend_from_slice(&[i0, i1, i0 + 1]);
                }
                if ring != rings - 1 {
                    indices.extend_from_slice(&[i0 + 1, i1, i1 + 1]);
                }
            }
        }

        let normals = positions.clone();
        Self::new(positions, indices, Some(normals))
    }

    /// Bake a transform into the mesh. Normals use the inverse transpose.
    pub fn transformed(mut self, matrix: &Mat4) -> Self {
        for p in &mut self.positions {
            *p = matrix.transform_point3(*p);
        }
        if let Some(normals) = &mut self.normals {
            let normal_matrix = Mat3::from_mat4(*matrix).inverse().transpose();
            for n in normals.iter_mut() {
                *n = (normal_matrix * *n).normalize_or_zero();
            }
        }
        self.bounds = Aabb::from_point_set(&self.positions);
        self
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Each vertex normal is the normalized, area-weighted average of the
    /// face normals of every triangle sharing that vertex.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            } else {
                *normal = Vec3::Y; // Default up normal for degenerate cases
            }
        }

        self.normals = Some(normals);
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check the mesh can be traced and uploaded as a triangle list.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.is_empty() {
            return Err("mesh has no triangles".to_string());
        }
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            ));
        }
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(format!(
                "index {} out of range for {} vertices",
                bad,
                self.positions.len()
            ));
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    self.positions.len()
                ));
            }
        }
        Ok(())
    }

    /// Corner positions and normals of triangle `index`.
    ///
    /// Falls back to the face normal for every corner when the mesh has no
    /// vertex normals.
    pub fn triangle(&self, index: usize) -> ([Vec3; 3], [Vec3; 3]) {
        let i = [
            self.indices[3 * index] as usize,
            self.indices[3 * index + 1] as usize,
            self.indices[3 * index + 2] as usize,
        ];
        let p = [self.positions[i[0]], self.positions[i[1]], self.positions[i[2]]];
        let n = match &self.normals {
            Some(normals) => [normals[i[0]], normals[i[1]], normals[i[2]]],
            None => [(p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero(); 3],
        };
        (p, n)
    }
}
