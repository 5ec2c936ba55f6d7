use bytemuck::{Pod, Zeroable};

/// Camera-space position plus normalized texture coordinate.
///
/// Laid out exactly as the GPU vertex buffer expects (`Float32x3`, `Float32x2`).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    #[inline]
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.position[2]
    }
}

/// Three vertex indices; flattens to the `Uint32` index buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Triangle(pub [u32; 3]);

/// Indexed triangle mesh.
///
/// Invariants upheld by `MeshBuilder`: every index is `< vertices.len()`, every vertex
/// has a finite positive depth, and no triangle spans a discontinuous edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// A mesh without vertices or without triangles cannot be rendered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
    }

    /// Flat `u32` view of the triangle list.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.triangles)
    }
}
