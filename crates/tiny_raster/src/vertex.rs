use tiny_core::Mesh;

/// Vertex data for rendering
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Expand an indexed mesh into a flat triangle list, three vertices per
/// triangle in index order.
pub fn flatten_mesh(mesh: &Mesh) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(mesh.triangle_count() * 3);
    for t in 0..mesh.triangle_count() {
        let (p, n) = mesh.triangle(t);
        for corner in 0..3 {
            vertices.push(Vertex {
                position: p[corner].to_array(),
                normal: n[corner].to_array(),
            });
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(Vertex::desc().attributes[1].offset, 12);
    }

    #[test]
    fn test_flatten_quad() {
        let vertices = flatten_mesh(&Mesh::quad());
        assert_eq!(vertices.len(), 6);
        assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert_eq!(vertices[3].position, vertices[0].position);
    }
}
