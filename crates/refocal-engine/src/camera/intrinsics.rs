use super::CameraError;

/// Pinhole intrinsics in pixels.
///
/// Plain value type: derived cameras are new values, nothing is mutated in place.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub width: u32,
    pub height: u32,
}

impl Intrinsics {
    #[inline]
    pub const fn new(fx: f32, fy: f32, cx: f32, cy: f32, width: u32, height: u32) -> Self {
        Self { fx, fy, cx, cy, width, height }
    }

    /// Intrinsics with the principal point at the image centre.
    #[inline]
    pub fn with_default_center(fx: f32, fy: f32, width: u32, height: u32) -> Self {
        Self::new(fx, fy, width as f32 / 2.0, height as f32 / 2.0, width, height)
    }

    /// Checks `fx, fy > 0`, a finite principal point and a non-zero resolution.
    pub fn validate(&self) -> Result<(), CameraError> {
        let focal_ok = self.fx.is_finite() && self.fy.is_finite() && self.fx > 0.0 && self.fy > 0.0;
        if !focal_ok {
            return Err(CameraError::NonPositiveFocal { fx: self.fx, fy: self.fy });
        }
        if !self.cx.is_finite() || !self.cy.is_finite() {
            return Err(CameraError::NonFinitePrincipalPoint { cx: self.cx, cy: self.cy });
        }
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::ZeroResolution { width: self.width, height: self.height });
        }
        Ok(())
    }

    /// Uniform focal scaling (zoom). Principal point and resolution are kept.
    #[inline]
    pub fn scaled(self, scale: f32) -> Self {
        Self::new(self.fx * scale, self.fy * scale, self.cx, self.cy, self.width, self.height)
    }

    /// Retargets to a new resolution, rescaling `fx, fy, cx, cy` proportionally.
    ///
    /// The field of view is unchanged. `self` must have a non-zero resolution.
    pub fn with_resolution(self, width: u32, height: u32) -> Self {
        let sx = width as f32 / self.width as f32;
        let sy = height as f32 / self.height as f32;
        Self::new(self.fx * sx, self.fy * sy, self.cx * sx, self.cy * sy, width, height)
    }

    /// Target camera for one requested focal scale.
    ///
    /// `fx, fy` are the source focal lengths times `scale`, whatever the output
    /// size. An output resolution different from the source moves only the
    /// principal point, proportionally.
    pub fn for_focal_scale(self, scale: f32, output: Option<(u32, u32)>) -> Self {
        let scaled = self.scaled(scale);
        match output {
            Some((w, h)) if (w, h) != (self.width, self.height) => Self {
                cx: self.cx * w as f32 / self.width as f32,
                cy: self.cy * h as f32 / self.height as f32,
                width: w,
                height: h,
                ..scaled
            },
            _ => scaled,
        }
    }

    /// Back-projects a continuous image coordinate at metric depth `z`.
    #[inline]
    pub fn back_project(&self, u: f32, v: f32, z: f32) -> [f32; 3] {
        [(u - self.cx) * z / self.fx, (v - self.cy) * z / self.fy, z]
    }

    /// Projects a camera-space point to continuous image coordinates.
    ///
    /// Returns `None` for points at or behind the camera plane.
    #[inline]
    pub fn project(&self, p: [f32; 3]) -> Option<[f32; 2]> {
        if p[2] <= 0.0 {
            return None;
        }
        Some([self.fx * p[0] / p[2] + self.cx, self.fy * p[1] / p[2] + self.cy])
    }
}
