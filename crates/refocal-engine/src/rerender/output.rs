/// Per-render result buffers, top row first, sized to the target camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    pub width: u32,
    pub height: u32,
    /// Interleaved RGB, 3 bytes per pixel.
    pub rgb: Vec<u8>,
    /// Camera-space Z in meters; 0 where nothing was rasterized.
    pub depth: Vec<f32>,
    /// 255 where a fragment was rasterized, else 0.
    pub mask: Vec<u8>,
}

impl RenderOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the buffers of a previous render.
    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.rgb.clear();
        self.depth.clear();
        self.mask.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            valid_pixels: self.mask.iter().filter(|&&m| m != 0).count(),
            total_pixels: self.num_pixels(),
        }
    }

    /// Fraction of pixels marked valid, 0 for an empty output.
    pub fn valid_fraction(&self) -> f32 {
        self.stats().valid_fraction()
    }
}

/// Coverage summary of one render.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct RenderStats {
    pub valid_pixels: usize,
    pub total_pixels: usize,
}

impl RenderStats {
    pub fn valid_fraction(&self) -> f32 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.valid_pixels as f32 / self.total_pixels as f32
    }
}
