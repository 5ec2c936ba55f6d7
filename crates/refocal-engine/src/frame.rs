//! Dense, row-major CPU image containers consumed by the mesh builder.
//!
//! Row 0 is the top of the image; element `(x, y)` lives at `y * width + x`.

use crate::mesh::MeshError;

/// 8-bit colour image with 1 (gray), 3 (RGB) or 4 (RGBA) interleaved channels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl ColorImage {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, MeshError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(MeshError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(MeshError::BufferSize { expected, actual: data.len() });
        }
        Ok(Self { width, height, channels, data })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns a 3-channel copy: gray is replicated, alpha is dropped.
    pub fn to_rgb(&self) -> ColorImage {
        let data = match self.channels {
            3 => self.data.clone(),
            4 => self.data.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect(),
            _ => self.data.iter().flat_map(|&g| [g, g, g]).collect(),
        };
        ColorImage { width: self.width, height: self.height, channels: 3, data }
    }
}

/// Metric depth map. Non-finite or non-positive samples are invalid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DepthMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl DepthMap {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, MeshError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MeshError::BufferSize { expected, actual: data.len() });
        }
        Ok(Self { width, height, data })
    }

    /// Depth map where every sample is `z`.
    pub fn filled(width: u32, height: u32, z: f32) -> Self {
        Self { width, height, data: vec![z; width as usize * height as usize] }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Multiplies every sample by `scale` (e.g. `0.001` for millimetre input).
    pub fn scale_in_place(&mut self, scale: f32) {
        if scale != 1.0 {
            self.data.iter_mut().for_each(|z| *z *= scale);
        }
    }
}

/// Per-pixel validity; non-zero means valid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidityMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ValidityMask {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, MeshError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MeshError::BufferSize { expected, actual: data.len() });
        }
        Ok(Self { width, height, data })
    }

    /// Number of valid (non-zero) entries.
    pub fn count_valid(&self) -> usize {
        self.data.iter().filter(|&&m| m != 0).count()
    }
}

/// Validity test applied to raw depth samples.
#[inline]
pub fn is_valid_depth(z: f32) -> bool {
    z.is_finite() && z > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_image_rejects_wrong_length() {
        let r = ColorImage::new(2, 2, 3, vec![0; 11]);
        assert_eq!(r, Err(MeshError::BufferSize { expected: 12, actual: 11 }));
    }

    #[test]
    fn color_image_rejects_two_channels() {
        let r = ColorImage::new(1, 1, 2, vec![0; 2]);
        assert_eq!(r, Err(MeshError::UnsupportedChannels(2)));
    }

    #[test]
    fn gray_expands_to_rgb() {
        let img = ColorImage::new(2, 1, 1, vec![10, 200]).unwrap();
        assert_eq!(img.to_rgb().data, vec![10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn rgba_drops_alpha() {
        let img = ColorImage::new(2, 1, 4, vec![1, 2, 3, 255, 4, 5, 6, 0]).unwrap();
        let rgb = img.to_rgb();
        assert_eq!(rgb.channels, 3);
        assert_eq!(rgb.data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn depth_scale_applies_to_every_sample() {
        let mut d = DepthMap::new(2, 1, vec![1000.0, 2500.0]).unwrap();
        d.scale_in_place(0.001);
        approx::assert_relative_eq!(d.data[0], 1.0);
        approx::assert_relative_eq!(d.data[1], 2.5);
    }

    #[test]
    fn depth_validity() {
        assert!(is_valid_depth(0.01));
        assert!(!is_valid_depth(0.0));
        assert!(!is_valid_depth(-1.0));
        assert!(!is_valid_depth(f32::NAN));
        assert!(!is_valid_depth(f32::INFINITY));
    }
}
