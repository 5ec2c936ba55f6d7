use crate::device::{BackendError, HeadlessGpu, HeadlessInit};

use super::framebuffer::{required_targets, AttachmentData, Framebuffer};
use super::geometry::{GeometryBuffers, TextureBinding};
use super::program::{Program, ProgramSource, UNIFORM_SIZE};
use super::readback::{RowOrder, NATIVE_ROW_ORDER};
use super::RenderCtx;

/// Headless rasterization backend: one device, one program, one framebuffer.
///
/// Knows nothing about meshes or cameras. Callers hand it a program, flat
/// geometry, an RGB texture and a 4x4 matrix, and read the attachments back.
///
/// Not meant to be driven from several threads; give each worker its own instance.
pub struct Rasterizer {
    program: Option<Program>,
    framebuffer: Option<Framebuffer>,
    geometry: GeometryBuffers,
    texture: Option<TextureBinding>,
    bind_group: Option<wgpu::BindGroup>,
    uniform: wgpu::Buffer,
    row_order: RowOrder,

    // Dropped last: everything above was allocated from it.
    gpu: HeadlessGpu,
}

impl Rasterizer {
    pub fn new(gpu: HeadlessGpu) -> Self {
        let uniform = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("refocal projection ubo"),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            program: None,
            framebuffer: None,
            geometry: GeometryBuffers::new(),
            texture: None,
            bind_group: None,
            uniform,
            row_order: NATIVE_ROW_ORDER,
            gpu,
        }
    }

    /// Acquires a headless device able to render every attachment and wraps it.
    pub fn initialize(init: &HeadlessInit) -> Result<Self, BackendError> {
        HeadlessGpu::new_blocking(&init.requiring(required_targets())).map(Self::new)
    }

    #[inline]
    pub fn ctx(&self) -> RenderCtx<'_> {
        RenderCtx::from_gpu(&self.gpu)
    }

    #[inline]
    pub fn gpu(&self) -> &HeadlessGpu {
        &self.gpu
    }

    pub fn compile_program(&mut self, src: &ProgramSource<'_>) -> Result<(), BackendError> {
        let program = Program::compile(&self.ctx(), src)?;
        self.program = Some(program);
        self.bind_group = None;
        Ok(())
    }

    /// Makes the framebuffer `width x height`, recreating it only when the size changes.
    ///
    /// On failure the previous framebuffer is gone and drawing is refused until a
    /// later call succeeds.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if self.framebuffer.as_ref().is_some_and(|fb| fb.size() == (width, height)) {
            return Ok(());
        }
        self.framebuffer = None;
        self.framebuffer = Some(Framebuffer::new(&self.ctx(), width, height)?);
        Ok(())
    }

    pub fn framebuffer_size(&self) -> Option<(u32, u32)> {
        self.framebuffer.as_ref().map(Framebuffer::size)
    }

    pub fn upload_geometry(&mut self, vertices: &[f32], indices: &[u32]) -> Result<(), BackendError> {
        let ctx = RenderCtx::from_gpu(&self.gpu);
        self.geometry.upload(&ctx, vertices, indices)
    }

    pub fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        rgb: &[u8],
        filter: wgpu::FilterMode,
    ) -> Result<(), BackendError> {
        let ctx = RenderCtx::from_gpu(&self.gpu);
        if TextureBinding::upload(&ctx, &mut self.texture, width, height, rgb, filter)? {
            self.bind_group = None;
        }
        Ok(())
    }

    /// Overrides the row order assumed at readback.
    pub fn set_row_order(&mut self, order: RowOrder) {
        self.row_order = order;
    }

    /// Clears all attachments, draws the uploaded geometry with `matrix` (column-major)
    /// bound at binding 0, copies the attachments to staging, and waits for the GPU.
    pub fn draw(&mut self, matrix: [[f32; 4]; 4], clear: wgpu::Color) -> Result<(), BackendError> {
        if !self.geometry.is_ready() {
            return Err(BackendError::MissingState("geometry"));
        }
        self.ensure_bind_group()?;

        let ctx = RenderCtx::from_gpu(&self.gpu);
        let (Some(program), Some(framebuffer), Some(bind_group)) =
            (self.program.as_ref(), self.framebuffer.as_ref(), self.bind_group.as_ref())
        else {
            return Err(BackendError::MissingState("a program and a framebuffer"));
        };

        let geometry = &self.geometry;
        let uniform = &self.uniform;
        ctx.validated(BackendError::Draw, || {
            ctx.queue.write_buffer(uniform, 0, bytemuck::cast_slice(&matrix));

            let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("refocal draw encoder"),
            });
            framebuffer.encode(&mut encoder, clear, |rpass| {
                rpass.set_pipeline(program.pipeline());
                rpass.set_bind_group(0, bind_group, &[]);
                geometry.draw(rpass);
            });
            ctx.queue.submit(std::iter::once(encoder.finish()));
        })
    }

    /// Reads the attachments written by the last `draw`.
    pub fn read_back(&self, out: &mut AttachmentData) -> Result<(), BackendError> {
        let framebuffer = self.framebuffer.as_ref().ok_or(BackendError::MissingState("a framebuffer"))?;
        framebuffer.read(&self.ctx(), self.row_order, out)
    }

    fn ensure_bind_group(&mut self) -> Result<(), BackendError> {
        if self.bind_group.is_some() {
            return Ok(());
        }
        let program = self.program.as_ref().ok_or(BackendError::MissingState("a program"))?;
        let texture = self.texture.as_ref().ok_or(BackendError::MissingState("a texture"))?;

        let bind_group = self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("refocal program bind group"),
            layout: program.bind_group_layout(),
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.uniform.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(texture.view()) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(texture.sampler()) },
            ],
        });
        self.bind_group = Some(bind_group);
        Ok(())
    }
}

impl Drop for Rasterizer {
    fn drop(&mut self) {
        self.uniform.destroy();
    }
}
