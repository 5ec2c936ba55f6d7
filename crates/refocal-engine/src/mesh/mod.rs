//! Depth map to 2.5D triangle mesh.
//!
//! Vertices live in camera space (see `camera`), one per valid depth pixel, placed
//! at the pixel centre. Triangles connect 2x2 pixel blocks with a fixed diagonal and
//! are dropped wherever the discontinuity policy breaks an edge.

mod builder;
mod bundle;
mod discontinuity;
mod error;
mod types;

pub use builder::MeshBuilder;
pub use bundle::{DepthMesh, DepthStats};
pub use discontinuity::DiscontinuityPolicy;
pub use error::MeshError;
pub use types::{Mesh, Triangle, Vertex};
