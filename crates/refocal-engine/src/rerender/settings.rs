use crate::camera::ClipDepth;

/// Texture sampling filter for the source image.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

impl TextureFilter {
    pub(crate) fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// Re-render engine settings.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RerenderSettings {
    pub filter: TextureFilter,

    /// RGB written where nothing is rasterized, in `[0, 1]`.
    pub clear_color: [f32; 3],

    /// Must match the backend's clip volume; wgpu uses `ZeroToOne`.
    pub clip_depth: ClipDepth,
}

impl Default for RerenderSettings {
    fn default() -> Self {
        Self {
            filter: TextureFilter::Linear,
            clear_color: [0.0; 3],
            clip_depth: ClipDepth::ZeroToOne,
        }
    }
}

impl RerenderSettings {
    pub(crate) fn clear(&self) -> wgpu::Color {
        let [r, g, b] = self.clear_color.map(|c| c.clamp(0.0, 1.0) as f64);
        wgpu::Color { r, g, b, a: 1.0 }
    }
}
