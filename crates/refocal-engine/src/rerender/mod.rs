//! Novel-view rendering of a depth mesh through arbitrary pinhole intrinsics.
//!
//! The engine owns one `Rasterizer`, uploads mesh and texture once, then renders
//! any number of target cameras sequentially into caller-owned `RenderOutput`s.

mod engine;
mod error;
mod output;
mod settings;

pub use engine::Rerenderer;
pub use error::RenderError;
pub use output::{RenderOutput, RenderStats};
pub use settings::{RerenderSettings, TextureFilter};
