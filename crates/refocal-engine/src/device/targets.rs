use super::BackendError;

/// Attachment formats a device must be able to render into and copy out of.
///
/// Checked once per adapter during device selection and again before a pipeline
/// or framebuffer is created, so an unsupported format is reported as an error
/// instead of reaching wgpu's validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargets {
    /// Color attachments, in location order. Each needs `RENDER_ATTACHMENT | COPY_SRC`.
    pub color: Vec<wgpu::TextureFormat>,
    /// Hidden-surface buffer. Needs `RENDER_ATTACHMENT`.
    pub depth: Option<wgpu::TextureFormat>,
}

impl RenderTargets {
    /// Checks the adapter's format capabilities.
    pub fn check_adapter(&self, adapter: &wgpu::Adapter) -> Result<(), BackendError> {
        self.check_formats(|f| adapter.get_texture_format_features(f))
    }

    /// Checks format capabilities reported by `features`.
    pub fn check_formats<F>(&self, features: F) -> Result<(), BackendError>
    where
        F: Fn(wgpu::TextureFormat) -> wgpu::TextureFormatFeatures,
    {
        let readable = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        for &format in &self.color {
            let allowed = features(format).allowed_usages;
            if !allowed.contains(readable) {
                return Err(BackendError::FramebufferIncomplete(format!(
                    "{format:?} cannot be used as a readable render target (allowed: {allowed:?})"
                )));
            }
        }
        if let Some(format) = self.depth {
            if !features(format).allowed_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
                return Err(BackendError::FramebufferIncomplete(format!(
                    "{format:?} cannot be used as a depth buffer"
                )));
            }
        }
        Ok(())
    }

    /// Checks attachment count and per-sample byte budget against `limits`.
    pub fn check_limits(&self, limits: &wgpu::Limits) -> Result<(), BackendError> {
        let count = self.color.len() as u32;
        if limits.max_color_attachments < count {
            return Err(BackendError::FramebufferIncomplete(format!(
                "device supports {} color attachments, {count} required",
                limits.max_color_attachments
            )));
        }
        let bytes_per_sample: u32 = self.color.iter().filter_map(|f| f.target_pixel_byte_cost()).sum();
        if bytes_per_sample > limits.max_color_attachment_bytes_per_sample {
            return Err(BackendError::FramebufferIncomplete(format!(
                "{bytes_per_sample} bytes per sample exceeds limit {}",
                limits.max_color_attachment_bytes_per_sample
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> RenderTargets {
        RenderTargets {
            color: vec![
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureFormat::R32Float,
                wgpu::TextureFormat::R8Unorm,
            ],
            depth: Some(wgpu::TextureFormat::Depth32Float),
        }
    }

    fn features(allowed_usages: wgpu::TextureUsages) -> wgpu::TextureFormatFeatures {
        wgpu::TextureFormatFeatures { allowed_usages, flags: wgpu::TextureFormatFeatureFlags::empty() }
    }

    #[test]
    fn renderable_formats_pass() {
        let all = targets().check_formats(|_| features(wgpu::TextureUsages::all()));
        assert_eq!(all, Ok(()));
    }

    #[test]
    fn float_target_without_render_usage_is_reported() {
        // Software GL drivers expose R32Float for sampling and storage only.
        let sample_only = wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::STORAGE_BINDING;
        let r = targets().check_formats(|f| {
            if f == wgpu::TextureFormat::R32Float { features(sample_only) } else { features(wgpu::TextureUsages::all()) }
        });
        assert!(matches!(r, Err(BackendError::FramebufferIncomplete(msg)) if msg.contains("R32Float")));
    }

    #[test]
    fn depth_format_must_be_renderable() {
        let r = targets().check_formats(|f| {
            if f == wgpu::TextureFormat::Depth32Float {
                features(wgpu::TextureUsages::TEXTURE_BINDING)
            } else {
                features(wgpu::TextureUsages::all())
            }
        });
        assert!(matches!(r, Err(BackendError::FramebufferIncomplete(msg)) if msg.contains("Depth32Float")));
    }

    #[test]
    fn attachment_limits() {
        assert_eq!(targets().check_limits(&wgpu::Limits::downlevel_webgl2_defaults()), Ok(()));

        let two = wgpu::Limits { max_color_attachments: 2, ..wgpu::Limits::default() };
        assert!(targets().check_limits(&two).is_err());

        let tight = wgpu::Limits { max_color_attachment_bytes_per_sample: 8, ..wgpu::Limits::default() };
        assert!(targets().check_limits(&tight).is_err());
    }
}
