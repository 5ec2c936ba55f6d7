use super::RenderTargets;

/// One entry of the adapter fallback chain.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AdapterChoice {
    /// Adapter at this position in `Instance::enumerate_adapters`.
    Indexed(usize),
    /// Whatever `request_adapter` picks for the configured power preference.
    Default,
    /// Software rasterizer, if the platform ships one.
    Fallback,
}

/// Initialization parameters for the headless GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct HeadlessInit {
    /// Adapter to prefer when several are present.
    ///
    /// Out-of-range indices fall through to the default adapter.
    pub device_index: Option<usize>,

    /// Backends the instance may use.
    pub backends: wgpu::Backends,

    /// Power preference for the default adapter request.
    pub power_preference: wgpu::PowerPreference,

    /// Try the platform's software adapter after every hardware option failed.
    pub allow_software: bool,

    /// Limit tiers requested from the adapter, most capable first.
    ///
    /// Device creation walks the list until one tier succeeds.
    pub limit_tiers: Vec<wgpu::Limits>,

    /// Attachments the device must support. Adapters or tiers that cannot
    /// render them count as failed attempts.
    pub render_targets: Option<RenderTargets>,
}

impl Default for HeadlessInit {
    fn default() -> Self {
        Self {
            device_index: None,
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            allow_software: true,
            limit_tiers: vec![
                wgpu::Limits::default(),
                wgpu::Limits::downlevel_defaults(),
                wgpu::Limits::downlevel_webgl2_defaults(),
            ],
            render_targets: None,
        }
    }
}

impl HeadlessInit {
    /// Initialization that prefers the adapter at `index`.
    pub fn with_device_index(index: Option<usize>) -> Self {
        Self { device_index: index, ..Self::default() }
    }

    /// Same configuration, additionally requiring `targets`.
    pub fn requiring(&self, targets: RenderTargets) -> Self {
        Self { render_targets: Some(targets), ..self.clone() }
    }

    /// Ordered adapter attempts for this configuration.
    pub fn adapter_chain(&self) -> Vec<AdapterChoice> {
        let mut chain = Vec::with_capacity(3);
        if let Some(i) = self.device_index {
            chain.push(AdapterChoice::Indexed(i));
        }
        chain.push(AdapterChoice::Default);
        if self.allow_software {
            chain.push(AdapterChoice::Fallback);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_skips_indexed_attempt() {
        let init = HeadlessInit::default();
        assert_eq!(init.adapter_chain(), vec![AdapterChoice::Default, AdapterChoice::Fallback]);
    }

    #[test]
    fn explicit_index_is_tried_first() {
        let init = HeadlessInit::with_device_index(Some(2));
        assert_eq!(
            init.adapter_chain(),
            vec![AdapterChoice::Indexed(2), AdapterChoice::Default, AdapterChoice::Fallback]
        );
    }

    #[test]
    fn software_can_be_disabled() {
        let init = HeadlessInit { allow_software: false, ..HeadlessInit::default() };
        assert_eq!(init.adapter_chain(), vec![AdapterChoice::Default]);
    }

    #[test]
    fn requiring_keeps_the_rest() {
        let targets = RenderTargets { color: vec![wgpu::TextureFormat::R32Float], depth: None };
        let init = HeadlessInit::with_device_index(Some(1)).requiring(targets.clone());
        assert_eq!(init.device_index, Some(1));
        assert_eq!(init.render_targets, Some(targets));
        assert_eq!(HeadlessInit::default().render_targets, None);
    }

    #[test]
    fn limit_tiers_shrink() {
        let tiers = HeadlessInit::default().limit_tiers;
        assert_eq!(tiers.len(), 3);
        assert!(tiers[0].max_texture_dimension_2d >= tiers[1].max_texture_dimension_2d);
        assert!(tiers[1].max_texture_dimension_2d >= tiers[2].max_texture_dimension_2d);
    }
}
