use super::{CameraError, Intrinsics};

/// Depth range of the clip volume after perspective division.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ClipDepth {
    /// `near -> -1`, `far -> +1` (OpenGL convention).
    NegOneToOne,
    /// `near -> 0`, `far -> 1` (wgpu / Vulkan / D3D convention).
    #[default]
    ZeroToOne,
}

/// Column-major 4x4 projection derived algebraically from pinhole intrinsics.
///
/// For a camera-space point `(X, Y, Z)` the clip position satisfies, after division
/// by `w = Z`:
/// - `x_ndc = 2 * (fx*X/Z + cx) / W - 1`
/// - `y_ndc = 1 - 2 * (fy*Y/Z + cy) / H` (image +Y down becomes clip +Y up)
/// - `z_ndc` monotonic in `Z`, hitting the `ClipDepth` bounds at `near` and `far`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionMatrix {
    cols: [[f32; 4]; 4],
}

impl ProjectionMatrix {
    pub fn from_intrinsics(
        k: &Intrinsics,
        near: f32,
        far: f32,
        depth: ClipDepth,
    ) -> Result<Self, CameraError> {
        k.validate()?;
        if !(near.is_finite() && far.is_finite() && near > 0.0 && near < far) {
            return Err(CameraError::InvalidClipRange { near, far });
        }

        let w = k.width as f32;
        let h = k.height as f32;
        let (a, b) = match depth {
            ClipDepth::NegOneToOne => ((far + near) / (far - near), -2.0 * far * near / (far - near)),
            ClipDepth::ZeroToOne => (far / (far - near), -far * near / (far - near)),
        };

        Ok(Self {
            cols: [
                [2.0 * k.fx / w, 0.0, 0.0, 0.0],
                [0.0, -2.0 * k.fy / h, 0.0, 0.0],
                [2.0 * k.cx / w - 1.0, 1.0 - 2.0 * k.cy / h, a, 1.0],
                [0.0, 0.0, b, 0.0],
            ],
        })
    }

    /// Columns, ready for upload as a WGSL `mat4x4<f32>`.
    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.cols
    }

    /// Multiplies a camera-space point (w = 1) into clip space.
    pub fn transform(&self, p: [f32; 3]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (r, o) in out.iter_mut().enumerate() {
            *o = self.cols[0][r] * p[0] + self.cols[1][r] * p[1] + self.cols[2][r] * p[2] + self.cols[3][r];
        }
        out
    }
}
