//! Pinhole camera model shared by mesh construction and re-rendering.
//!
//! Canonical camera space:
//! - +X right, +Y down, +Z forward (into the scene)
//! - image origin top-left, pixel `(u, v)` covers `[u, u+1) x [v, v+1)`
//!
//! The projection builder converts this space to GPU clip space.

mod intrinsics;
mod projection;

pub use intrinsics::Intrinsics;
pub use projection::{ClipDepth, ProjectionMatrix};

/// Invalid camera parameters, detected before any GPU work.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CameraError {
    #[error("focal length must be positive and finite (fx={fx}, fy={fy})")]
    NonPositiveFocal { fx: f32, fy: f32 },

    #[error("principal point must be finite (cx={cx}, cy={cy})")]
    NonFinitePrincipalPoint { cx: f32, cy: f32 },

    #[error("image resolution must be non-zero ({width}x{height})")]
    ZeroResolution { width: u32, height: u32 },

    #[error("clip range requires 0 < near < far (near={near}, far={far})")]
    InvalidClipRange { near: f32, far: f32 },
}
