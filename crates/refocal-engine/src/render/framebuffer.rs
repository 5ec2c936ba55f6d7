use crate::device::{BackendError, RenderTargets};

use super::readback::{self, RowOrder};
use super::RenderCtx;

/// Attachment 0: 8-bit RGB, stored with an opaque alpha channel.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Attachment 1: metric camera-space depth.
pub const DEPTH_VALUE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
/// Attachment 2: validity marker.
pub const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
/// Hidden-surface buffer; never read back.
pub const DEPTH_BUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub const TARGET_FORMATS: [wgpu::TextureFormat; 3] = [COLOR_FORMAT, DEPTH_VALUE_FORMAT, MASK_FORMAT];

const BYTES_PER_PIXEL: [u32; 3] = [4, 4, 1];

/// Attachment formats the rerender pass writes.
pub fn required_targets() -> RenderTargets {
    RenderTargets { color: TARGET_FORMATS.to_vec(), depth: Some(DEPTH_BUFFER_FORMAT) }
}

/// CPU copies of the three color attachments, top row first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentData {
    pub width: u32,
    pub height: u32,
    /// 3 bytes per pixel.
    pub rgb: Vec<u8>,
    pub depth: Vec<f32>,
    /// 0 or 255.
    pub mask: Vec<u8>,
}

struct Attachment {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    staging: wgpu::Buffer,
    padded_row_bytes: u32,
    row_bytes: u32,
}

/// Offscreen multi-target render target plus its readback staging buffers.
///
/// Owned textures and buffers are destroyed on drop, so a resize never leaks
/// the previous allocation.
pub struct Framebuffer {
    width: u32,
    height: u32,
    attachments: [Attachment; 3],
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl Framebuffer {
    /// Creates a `width x height` framebuffer after checking the device can render
    /// and copy every attachment format at that size.
    pub fn new(ctx: &RenderCtx<'_>, width: u32, height: u32) -> Result<Self, BackendError> {
        check_complete(ctx, width, height)?;

        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let labels = ["refocal color", "refocal metric depth", "refocal mask"];
        let (attachments, depth_texture, depth_view) = ctx.validated(BackendError::FramebufferIncomplete, || {
            let attachments = [0usize, 1, 2].map(|i| {
                let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(labels[i]),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: TARGET_FORMATS[i],
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                let padded_row_bytes = readback::padded_bytes_per_row(width, BYTES_PER_PIXEL[i]);
                let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(labels[i]),
                    size: padded_row_bytes as u64 * height as u64,
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                    mapped_at_creation: false,
                });
                Attachment { texture, view, staging, padded_row_bytes, row_bytes: width * BYTES_PER_PIXEL[i] }
            });

            let depth_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("refocal depth buffer"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_BUFFER_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
            (attachments, depth_texture, depth_view)
        })?;

        log::debug!("framebuffer created: {width}x{height}");
        Ok(Self { width, height, attachments, depth_texture, depth_view })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Records a pass that clears every attachment and runs `draw`, followed by the
    /// attachment-to-staging copies.
    pub fn encode<F>(&self, encoder: &mut wgpu::CommandEncoder, clear: wgpu::Color, draw: F)
    where
        F: FnOnce(&mut wgpu::RenderPass<'_>),
    {
        {
            let clear_ops = |value| wgpu::Operations { load: wgpu::LoadOp::Clear(value), store: wgpu::StoreOp::Store };
            let color_attachments = [
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.attachments[0].view,
                    resolve_target: None,
                    ops: clear_ops(clear),
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.attachments[1].view,
                    resolve_target: None,
                    ops: clear_ops(wgpu::Color::TRANSPARENT),
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.attachments[2].view,
                    resolve_target: None,
                    ops: clear_ops(wgpu::Color::TRANSPARENT),
                    depth_slice: None,
                }),
            ];

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("refocal rerender pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            draw(&mut rpass);
        }

        let size = wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 };
        for a in &self.attachments {
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &a.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &a.staging,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(a.padded_row_bytes),
                        rows_per_image: Some(self.height),
                    },
                },
                size,
            );
        }
    }

    /// Maps the staging buffers filled by the last submitted `encode` and converts
    /// them to tightly packed, top-down CPU buffers.
    pub fn read(&self, ctx: &RenderCtx<'_>, order: RowOrder, out: &mut AttachmentData) -> Result<(), BackendError> {
        let buffers = [&self.attachments[0].staging, &self.attachments[1].staging, &self.attachments[2].staging];
        readback::map_read_blocking(ctx.device, &buffers)?;

        let h = self.height as usize;
        let [color, depth, mask] = self.attachments.each_ref().map(|a| {
            let mapped = a.staging.slice(..).get_mapped_range();
            readback::unpad_rows(&mapped, a.row_bytes as usize, a.padded_row_bytes as usize, h, order)
        });
        for a in &self.attachments {
            a.staging.unmap();
        }

        out.width = self.width;
        out.height = self.height;
        out.rgb.clear();
        out.rgb.extend(color.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]));
        out.depth.clear();
        out.depth.extend(depth.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])));
        out.mask.clear();
        out.mask.extend(mask.iter().map(|&m| if m != 0 { 255 } else { 0 }));
        Ok(())
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        for a in &self.attachments {
            a.texture.destroy();
            a.staging.destroy();
        }
        self.depth_texture.destroy();
    }
}

/// Rejects sizes or formats the device cannot render to and read back.
fn check_complete(ctx: &RenderCtx<'_>, width: u32, height: u32) -> Result<(), BackendError> {
    if width == 0 || height == 0 {
        return Err(BackendError::FramebufferIncomplete(format!("zero size {width}x{height}")));
    }

    let limits = ctx.device.limits();
    let max_dim = limits.max_texture_dimension_2d;
    if width > max_dim || height > max_dim {
        return Err(BackendError::FramebufferIncomplete(format!(
            "{width}x{height} exceeds max texture dimension {max_dim}"
        )));
    }

    let targets = required_targets();
    targets.check_limits(&limits)?;
    targets.check_adapter(ctx.adapter)
}
