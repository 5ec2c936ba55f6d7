use crate::device::BackendError;

use super::RenderCtx;

/// Interleaved `position.xyz, uv.xy` per vertex.
pub const FLOATS_PER_VERTEX: usize = 5;

const VERTEX_STRIDE: u64 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as u64;
const VERTEX_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x2  // uv
];

pub(super) fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRS,
    }
}

// ── vertex / index buffers ────────────────────────────────────────────────

/// Vertex and index buffers, rewritten in place while they fit.
#[derive(Default)]
pub struct GeometryBuffers {
    vbo: Option<wgpu::Buffer>,
    ibo: Option<wgpu::Buffer>,
    index_count: u32,
}

impl GeometryBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads a flat interleaved vertex array and a triangle-list index array.
    pub fn upload(&mut self, ctx: &RenderCtx<'_>, vertices: &[f32], indices: &[u32]) -> Result<(), BackendError> {
        validate_geometry(vertices, indices)?;

        let max = ctx.device.limits().max_buffer_size;
        let vbytes = std::mem::size_of_val(vertices) as u64;
        let ibytes = std::mem::size_of_val(indices) as u64;
        for (what, size) in [("vertex buffer", vbytes), ("index buffer", ibytes)] {
            if size > max {
                return Err(BackendError::LimitExceeded { what, size, limit: max });
            }
        }

        write_or_grow(ctx, &mut self.vbo, "refocal vbo", wgpu::BufferUsages::VERTEX, bytemuck::cast_slice(vertices));
        write_or_grow(ctx, &mut self.ibo, "refocal ibo", wgpu::BufferUsages::INDEX, bytemuck::cast_slice(indices));
        self.index_count = indices.len() as u32;

        log::debug!(
            "geometry uploaded: {} vertices, {} triangles",
            vertices.len() / FLOATS_PER_VERTEX,
            indices.len() / 3
        );
        Ok(())
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.index_count > 0 && self.vbo.is_some() && self.ibo.is_some()
    }

    /// Binds both buffers and issues the indexed draw.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        let (Some(vbo), Some(ibo)) = (self.vbo.as_ref(), self.ibo.as_ref()) else { return };
        let ibytes = self.index_count as u64 * 4;
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..ibytes), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

impl Drop for GeometryBuffers {
    fn drop(&mut self) {
        for b in [self.vbo.take(), self.ibo.take()].into_iter().flatten() {
            b.destroy();
        }
    }
}

fn validate_geometry(vertices: &[f32], indices: &[u32]) -> Result<(), BackendError> {
    if vertices.is_empty() {
        return Err(BackendError::EmptyUpload("vertex buffer"));
    }
    if indices.is_empty() {
        return Err(BackendError::EmptyUpload("index buffer"));
    }
    if vertices.len() % FLOATS_PER_VERTEX != 0 {
        return Err(BackendError::InvalidGeometry(format!(
            "{} floats is not a whole number of {FLOATS_PER_VERTEX}-float vertices",
            vertices.len()
        )));
    }
    if indices.len() % 3 != 0 {
        return Err(BackendError::InvalidGeometry(format!(
            "{} indices is not a whole number of triangles",
            indices.len()
        )));
    }
    let count = (vertices.len() / FLOATS_PER_VERTEX) as u64;
    if let Some(&bad) = indices.iter().find(|&&i| i as u64 >= count) {
        return Err(BackendError::InvalidGeometry(format!("index {bad} out of range for {count} vertices")));
    }
    Ok(())
}

/// Writes `data` into `slot`, replacing the buffer only when it is too small.
fn write_or_grow(
    ctx: &RenderCtx<'_>,
    slot: &mut Option<wgpu::Buffer>,
    label: &'static str,
    usage: wgpu::BufferUsages,
    data: &[u8],
) {
    let size = data.len() as u64;
    let fits = slot.as_ref().is_some_and(|b| b.size() >= size);
    if !fits {
        if let Some(old) = slot.take() {
            old.destroy();
        }
        *slot = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size.next_power_of_two().max(256),
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
    }
    if let Some(buffer) = slot.as_ref() {
        ctx.queue.write_buffer(buffer, 0, data);
    }
}

// ── texture ───────────────────────────────────────────────────────────────

/// Sampled RGB texture with its view and edge-clamped sampler.
pub struct TextureBinding {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    filter: wgpu::FilterMode,
}

impl TextureBinding {
    /// Uploads `width x height` RGB bytes into `slot`.
    ///
    /// A texture of the same size is rewritten in place. Returns `true` when the
    /// texture or sampler was replaced, so bind groups referencing it must be rebuilt.
    pub fn upload(
        ctx: &RenderCtx<'_>,
        slot: &mut Option<TextureBinding>,
        width: u32,
        height: u32,
        rgb: &[u8],
        filter: wgpu::FilterMode,
    ) -> Result<bool, BackendError> {
        if width == 0 || height == 0 || rgb.is_empty() {
            return Err(BackendError::EmptyUpload("texture"));
        }
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(BackendError::InvalidGeometry(format!(
                "texture holds {} bytes, expected {expected} for {width}x{height} RGB",
                rgb.len()
            )));
        }
        let max = ctx.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(BackendError::LimitExceeded {
                what: "texture dimension",
                size: width.max(height) as u64,
                limit: max as u64,
            });
        }

        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        if let Some(b) = slot.as_mut().filter(|b| b.texture.size() == size) {
            write_rgb(ctx, &b.texture, size, rgb);
            if b.filter == filter {
                return Ok(false);
            }
            b.sampler = create_sampler(ctx, filter);
            b.filter = filter;
            return Ok(true);
        }

        // Dropping the old binding destroys its texture.
        *slot = None;
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("refocal source texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        write_rgb(ctx, &texture, size, rgb);
        let sampler = create_sampler(ctx, filter);

        log::debug!("texture uploaded: {width}x{height}");
        *slot = Some(Self { texture, view, sampler, filter });
        Ok(true)
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        let s = self.texture.size();
        (s.width, s.height)
    }
}

impl Drop for TextureBinding {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

fn write_rgb(ctx: &RenderCtx<'_>, texture: &wgpu::Texture, size: wgpu::Extent3d, rgb: &[u8]) {
    let rgba = rgb_to_rgba(rgb);
    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * size.width),
            rows_per_image: Some(size.height),
        },
        size,
    );
}

fn create_sampler(ctx: &RenderCtx<'_>, filter: wgpu::FilterMode) -> wgpu::Sampler {
    ctx.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("refocal source sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

/// wgpu has no 3-channel 8-bit format; alpha is set opaque.
fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_matches_mesh_vertex() {
        assert_eq!(VERTEX_STRIDE as usize, std::mem::size_of::<crate::mesh::Vertex>());
    }

    #[test]
    fn rgb_expands_with_opaque_alpha() {
        assert_eq!(rgb_to_rgba(&[1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn empty_geometry_is_rejected() {
        assert_eq!(validate_geometry(&[], &[0, 1, 2]), Err(BackendError::EmptyUpload("vertex buffer")));
        assert_eq!(validate_geometry(&[0.0; 15], &[]), Err(BackendError::EmptyUpload("index buffer")));
    }

    #[test]
    fn ragged_geometry_is_rejected() {
        assert!(matches!(validate_geometry(&[0.0; 14], &[0, 1, 2]), Err(BackendError::InvalidGeometry(_))));
        assert!(matches!(validate_geometry(&[0.0; 15], &[0, 1]), Err(BackendError::InvalidGeometry(_))));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let r = validate_geometry(&[0.0; 15], &[0, 1, 3]);
        assert!(matches!(r, Err(BackendError::InvalidGeometry(msg)) if msg.contains("index 3")));
    }

    #[test]
    fn well_formed_geometry_passes() {
        assert_eq!(validate_geometry(&[0.0; 20], &[0, 1, 3, 0, 3, 2]), Ok(()));
    }
}
