use super::{AdapterChoice, BackendError, HeadlessInit, RenderTargets};

/// Owns wgpu core objects for offscreen rendering.
///
/// This type is the low-level rendering context:
/// - creates and stores Instance/Adapter/Device/Queue with no surface attached
/// - records which fallback attempt produced the device
///
/// Movable, not cloneable. Dropping it destroys the device, which releases every
/// GPU allocation made from it.
pub struct HeadlessGpu {
    /// wgpu instance used to create the adapter.
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Adapter attempt that succeeded.
    choice: AdapterChoice,

    /// Index into `HeadlessInit::limit_tiers` that succeeded.
    tier: usize,
}

impl HeadlessGpu {
    /// Creates a headless GPU context, walking the adapter and limit-tier chains.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: &HeadlessInit) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let mut failures = Vec::new();
        let mut found_adapter = false;
        for choice in init.adapter_chain() {
            let adapter = match request_adapter(&instance, init, choice).await {
                Ok(a) => a,
                Err(e) => {
                    log::warn!("adapter attempt {choice:?} failed: {e}");
                    failures.push(format!("{choice:?}: {e}"));
                    continue;
                }
            };

            found_adapter = true;
            let info = adapter.get_info();
            if let Some(targets) = &init.render_targets {
                if let Err(e) = targets.check_adapter(&adapter) {
                    log::warn!("adapter {} ({choice:?}) skipped: {e}", info.name);
                    failures.push(format!("{}: {e}", info.name));
                    continue;
                }
            }
            match request_device(&adapter, &init.limit_tiers, init.render_targets.as_ref()).await {
                Ok((device, queue, tier)) => {
                    log::info!(
                        "GPU adapter selected: {} ({:?}, {:?}) via {choice:?}, limit tier {tier}",
                        info.name,
                        info.backend,
                        info.device_type
                    );
                    return Ok(Self { instance, adapter, device, queue, choice, tier });
                }
                Err(e) => {
                    log::warn!("adapter {} ({choice:?}) could not create a device: {e}", info.name);
                    failures.push(format!("{}: {e}", info.name));
                }
            }
        }

        let report = failures.join("; ");
        if found_adapter {
            Err(BackendError::DeviceUnavailable(report))
        } else {
            Err(BackendError::NoAdapter(report))
        }
    }

    /// Blocking wrapper around `new`.
    pub fn new_blocking(init: &HeadlessInit) -> Result<Self, BackendError> {
        pollster::block_on(Self::new(init))
    }

    /// Returns a reference to the wgpu instance.
    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Returns a reference to the selected adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Adapter attempt that produced this context.
    pub fn choice(&self) -> AdapterChoice {
        self.choice
    }

    /// Adapter name, backend and driver, on one line.
    pub fn info(&self) -> String {
        let info = self.adapter.get_info();
        let driver = match (info.driver.is_empty(), info.driver_info.is_empty()) {
            (true, true) => "unknown driver".to_owned(),
            (false, true) => info.driver.clone(),
            (true, false) => info.driver_info.clone(),
            (false, false) => format!("{} {}", info.driver, info.driver_info),
        };
        format!(
            "{} | backend {:?} | {:?} | {} | limit tier {}",
            info.name, info.backend, info.device_type, driver, self.tier
        )
    }
}

impl Drop for HeadlessGpu {
    fn drop(&mut self) {
        log::debug!("destroying headless GPU device");
        self.device.destroy();
    }
}

async fn request_adapter(
    instance: &wgpu::Instance,
    init: &HeadlessInit,
    choice: AdapterChoice,
) -> Result<wgpu::Adapter, String> {
    match choice {
        AdapterChoice::Indexed(i) => {
            let adapters = instance.enumerate_adapters(init.backends).await;
            let count = adapters.len();
            adapters
                .into_iter()
                .nth(i)
                .ok_or_else(|| format!("index {i} out of range ({count} adapters)"))
        }
        AdapterChoice::Default | AdapterChoice::Fallback => instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: choice == AdapterChoice::Fallback,
            })
            .await
            .map_err(|e| e.to_string()),
    }
}

/// Walks the limit tiers, most capable first, until a device is created.
///
/// Tiers too small for `targets` are skipped without a device request.
async fn request_device(
    adapter: &wgpu::Adapter,
    tiers: &[wgpu::Limits],
    targets: Option<&RenderTargets>,
) -> Result<(wgpu::Device, wgpu::Queue, usize), BackendError> {
    let mut last = String::from("no limit tiers configured");
    for (tier, limits) in tiers.iter().enumerate() {
        let required_limits = limits.clone().using_resolution(adapter.limits());
        if let Some(Err(e)) = targets.map(|t| t.check_limits(&required_limits)) {
            log::warn!("limit tier {tier} skipped: {e}");
            last = e.to_string();
            continue;
        }
        let result = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("refocal headless device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await;
        match result {
            Ok((device, queue)) => return Ok((device, queue, tier)),
            Err(e) => {
                log::warn!("limit tier {tier} rejected: {e}");
                last = e.to_string();
            }
        }
    }
    Err(BackendError::DeviceUnavailable(last))
}
