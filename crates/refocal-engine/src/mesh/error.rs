/// Input and mesh-construction failures.
///
/// None of these are fatal to a process: callers may skip the frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("empty input image")]
    EmptyInput,

    #[error("RGB and depth dimensions mismatch: rgb {rgb:?}, depth {depth:?}")]
    DimensionMismatch { rgb: (u32, u32), depth: (u32, u32) },

    #[error("buffer holds {actual} elements, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(u8),

    #[error("depth map has no valid samples")]
    NoValidVertices,

    #[error("depth map produced {vertices} vertices but no triangles")]
    NoTriangles { vertices: usize },
}
