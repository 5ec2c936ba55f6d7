use crate::device::{BackendError, HeadlessGpu};

/// Borrowed adapter, device and queue handed to every backend allocation.
///
/// The adapter is only needed for format capability queries.
#[derive(Copy, Clone)]
pub struct RenderCtx<'a> {
    pub adapter: &'a wgpu::Adapter,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(adapter: &'a wgpu::Adapter, device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { adapter, device, queue }
    }

    #[inline]
    pub fn from_gpu(gpu: &'a HeadlessGpu) -> Self {
        Self::new(gpu.adapter(), gpu.device(), gpu.queue())
    }

    /// Runs `f` inside a validation error scope.
    ///
    /// A validation error raised by any call in `f` is returned through `map`
    /// instead of reaching the device's uncaptured-error handler, which panics.
    pub(crate) fn validated<T>(
        &self,
        map: impl FnOnce(String) -> BackendError,
        f: impl FnOnce() -> T,
    ) -> Result<T, BackendError> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        match pollster::block_on(scope.pop()) {
            Some(err) => Err(map(err.to_string())),
            None => Ok(value),
        }
    }
}
