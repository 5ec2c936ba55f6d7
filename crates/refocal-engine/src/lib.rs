//! Refocal engine crate.
//!
//! Turns one RGB-D frame into a textured 2.5D mesh and re-renders it headlessly
//! through arbitrary pinhole intrinsics (synthetic zoom / refocal length).
//!
//! Pipeline:
//! - `frame` holds decoded RGB and metric depth
//! - `mesh` builds the camera-space mesh and texture bundle
//! - `rerender` uploads it once and renders each target camera
//! - `render` / `device` are the GPU backend underneath

pub mod camera;
pub mod device;
pub mod frame;
pub mod logging;
pub mod mesh;
pub mod render;
pub mod rerender;

pub use camera::{ClipDepth, Intrinsics, ProjectionMatrix};
pub use frame::{ColorImage, DepthMap, ValidityMask};
pub use mesh::{DepthMesh, DiscontinuityPolicy, Mesh, MeshBuilder};
pub use rerender::{RenderError, RenderOutput, RenderStats, Rerenderer, RerenderSettings};
