use crate::camera::{Intrinsics, ProjectionMatrix};
use crate::device::HeadlessInit;
use crate::frame::ColorImage;
use crate::mesh::{DepthMesh, Mesh};
use crate::render::{AttachmentData, ProgramSource, Rasterizer};

use super::{RenderError, RenderOutput, RenderStats, RerenderSettings};

const VERTEX_SHADER: &str = include_str!("../render/shaders/rerender_vs.wgsl");
const FRAGMENT_SHADER: &str = include_str!("../render/shaders/rerender_fs.wgsl");

/// Renders an uploaded depth mesh through arbitrary target intrinsics.
///
/// Usage:
/// 1. `initialize` once.
/// 2. `upload_mesh` and `upload_texture` (or `upload_bundle`).
/// 3. `render` once per target camera; outputs are resized as needed.
pub struct Rerenderer {
    backend: Rasterizer,
    settings: RerenderSettings,
    mesh_ready: bool,
    texture_ready: bool,
    scratch: AttachmentData,
}

impl Rerenderer {
    /// Acquires a headless GPU (preferring adapter `device_index`) and compiles
    /// the re-render program.
    pub fn initialize(device_index: Option<usize>) -> Result<Self, RenderError> {
        Self::with_settings(&HeadlessInit::with_device_index(device_index), RerenderSettings::default())
    }

    pub fn with_settings(init: &HeadlessInit, settings: RerenderSettings) -> Result<Self, RenderError> {
        let mut backend = Rasterizer::initialize(init)?;
        backend.compile_program(&ProgramSource {
            label: "refocal rerender",
            vertex: VERTEX_SHADER,
            fragment: FRAGMENT_SHADER,
        })?;
        log::info!("re-render engine ready on {}", backend.gpu().info());
        Ok(Self {
            backend,
            settings,
            mesh_ready: false,
            texture_ready: false,
            scratch: AttachmentData::default(),
        })
    }

    #[inline]
    pub fn settings(&self) -> &RerenderSettings {
        &self.settings
    }

    /// Adapter name, backend and driver.
    pub fn gpu_info(&self) -> String {
        self.backend.gpu().info()
    }

    pub fn upload_mesh(&mut self, mesh: &Mesh) -> Result<(), RenderError> {
        self.mesh_ready = false;
        let vertices: &[f32] = bytemuck::cast_slice(&mesh.vertices);
        self.backend.upload_geometry(vertices, mesh.indices())?;
        self.mesh_ready = true;
        Ok(())
    }

    /// Uploads the source image; gray and RGBA input is converted to RGB.
    pub fn upload_texture(&mut self, image: &ColorImage) -> Result<(), RenderError> {
        self.texture_ready = false;
        let filter = self.settings.filter.to_wgpu();
        if image.channels == 3 {
            self.backend.upload_texture(image.width, image.height, &image.data, filter)?;
        } else {
            let rgb = image.to_rgb();
            self.backend.upload_texture(rgb.width, rgb.height, &rgb.data, filter)?;
        }
        self.texture_ready = true;
        Ok(())
    }

    /// Uploads the mesh and texture of a built bundle.
    pub fn upload_bundle(&mut self, bundle: &DepthMesh) -> Result<(), RenderError> {
        self.upload_mesh(bundle.mesh())?;
        self.upload_texture(bundle.texture())
    }

    /// Renders the uploaded mesh as seen by `target` and reads back RGB, metric
    /// depth and validity mask into `out`.
    ///
    /// `source` describes the camera the mesh was built with; only `target` and the
    /// clip range affect the image. Target size may differ from the uploaded data.
    ///
    /// On error `out` is left empty.
    pub fn render(
        &mut self,
        source: &Intrinsics,
        target: &Intrinsics,
        near: f32,
        far: f32,
        out: &mut RenderOutput,
    ) -> Result<RenderStats, RenderError> {
        let result = self.render_into(source, target, near, far, out);
        if result.is_err() {
            out.clear();
        }
        result
    }

    fn render_into(
        &mut self,
        source: &Intrinsics,
        target: &Intrinsics,
        near: f32,
        far: f32,
        out: &mut RenderOutput,
    ) -> Result<RenderStats, RenderError> {
        if !self.mesh_ready {
            return Err(RenderError::NotReady("mesh"));
        }
        if !self.texture_ready {
            return Err(RenderError::NotReady("texture"));
        }
        source.validate()?;
        let proj = ProjectionMatrix::from_intrinsics(target, near, far, self.settings.clip_depth)?;

        log::debug!(
            "render {}x{} (fx {:.1} -> {:.1}, x{:.3})",
            target.width,
            target.height,
            source.fx,
            target.fx,
            target.fx / source.fx
        );

        self.backend.resize(target.width, target.height)?;
        self.backend.draw(proj.to_cols_array_2d(), self.settings.clear())?;
        self.backend.read_back(&mut self.scratch)?;

        out.width = self.scratch.width;
        out.height = self.scratch.height;
        std::mem::swap(&mut out.rgb, &mut self.scratch.rgb);
        std::mem::swap(&mut out.depth, &mut self.scratch.depth);
        std::mem::swap(&mut out.mask, &mut self.scratch.mask);

        let stats = out.stats();
        log::info!(
            "rendered {}x{}: {:.2}% valid",
            out.width,
            out.height,
            stats.valid_fraction() * 100.0
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::BackendError;
    use crate::frame::DepthMap;
    use crate::mesh::DiscontinuityPolicy;
    use crate::rerender::TextureFilter;
    use approx::assert_relative_eq;

    const W: u32 = 64;
    const H: u32 = 48;
    const NEAR: f32 = 0.1;
    const FAR: f32 = 100.0;

    fn engine() -> Option<Rerenderer> {
        let settings = RerenderSettings { filter: TextureFilter::Nearest, ..RerenderSettings::default() };
        match Rerenderer::with_settings(&HeadlessInit::default(), settings) {
            Ok(e) => Some(e),
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                None
            }
        }
    }

    fn source() -> Intrinsics {
        Intrinsics::with_default_center(60.0, 60.0, W, H)
    }

    /// Texel `(u, v)` encodes its own coordinates.
    fn coord_texture() -> ColorImage {
        let data = (0..H)
            .flat_map(|v| (0..W).flat_map(move |u| [u as u8 * 3, v as u8 * 5, 200]))
            .collect();
        ColorImage::new(W, H, 3, data).unwrap()
    }

    fn bundle(depth: &DepthMap) -> DepthMesh {
        let mut b = DepthMesh::new();
        b.build(&coord_texture(), depth, source(), DiscontinuityPolicy::default()).unwrap();
        b
    }

    fn render_plane(engine: &mut Rerenderer, target: &Intrinsics) -> RenderOutput {
        engine.upload_bundle(&bundle(&DepthMap::filled(W, H, 5.0))).unwrap();
        let mut out = RenderOutput::new();
        engine.render(&source(), target, NEAR, FAR, &mut out).unwrap();
        out
    }

    #[test]
    fn same_camera_reproduces_source() {
        let Some(mut engine) = engine() else { return };
        let out = render_plane(&mut engine, &source());

        assert_eq!((out.width, out.height), (W, H));
        // The last row and column sit exactly on the mesh border and may fall to the
        // fill rule; everything else is covered.
        let min = ((W - 1) * (H - 1)) as f32 / (W * H) as f32;
        assert!(out.valid_fraction() >= min - 1e-4, "valid {}", out.valid_fraction());

        for (i, &m) in out.mask.iter().enumerate() {
            if m != 0 {
                assert_relative_eq!(out.depth[i], 5.0, max_relative = 1e-4);
            } else {
                assert_eq!(out.depth[i], 0.0);
            }
        }

        let tex = coord_texture();
        for (u, v) in [(1u32, 1u32), (10, 20), (32, 24), (W - 2, H - 2)] {
            let i = (v * W + u) as usize;
            assert_eq!(out.mask[i], 255, "pixel ({u}, {v}) not covered");
            assert_eq!(&out.rgb[i * 3..i * 3 + 3], &tex.data[i * 3..i * 3 + 3], "pixel ({u}, {v})");
        }
    }

    #[test]
    fn zoom_changes_coverage() {
        let Some(mut engine) = engine() else { return };
        let src = source();

        let zoom_out = render_plane(&mut engine, &src.for_focal_scale(0.5, None)).valid_fraction();
        let same = render_plane(&mut engine, &src).valid_fraction();
        let zoom_in = render_plane(&mut engine, &src.for_focal_scale(2.0, None)).valid_fraction();

        assert!(zoom_out < same);
        assert!(same <= zoom_in);
        assert_relative_eq!(zoom_in, 1.0);
        assert_relative_eq!(zoom_out, 0.25, epsilon = 0.03);
    }

    #[test]
    fn output_follows_target_resolution() {
        let Some(mut engine) = engine() else { return };
        let target = source().for_focal_scale(1.0, Some((32, 24)));
        let out = render_plane(&mut engine, &target);
        assert_eq!((out.width, out.height), (32, 24));
        assert_eq!(out.rgb.len(), 32 * 24 * 3);
        assert!(out.valid_fraction() > 0.9);
    }

    #[test]
    fn beyond_far_plane_is_empty() {
        let Some(mut engine) = engine() else { return };
        engine.upload_bundle(&bundle(&DepthMap::filled(W, H, 5.0))).unwrap();
        let mut out = RenderOutput::new();
        let stats = engine.render(&source(), &source(), NEAR, 4.0, &mut out).unwrap();
        assert_eq!(stats.valid_pixels, 0);
        assert!(out.depth.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn step_edge_is_not_bridged() {
        let Some(mut engine) = engine() else { return };
        let data = (0..H).flat_map(|_| (0..W).map(|u| if u < W / 2 { 1.0 } else { 3.0 })).collect();
        engine.upload_bundle(&bundle(&DepthMap::new(W, H, data).unwrap())).unwrap();

        let mut out = RenderOutput::new();
        engine.render(&source(), &source(), NEAR, FAR, &mut out).unwrap();
        for (i, &m) in out.mask.iter().enumerate() {
            if m != 0 {
                let z = out.depth[i];
                assert!((z - 1.0).abs() < 1e-3 || (z - 3.0).abs() < 1e-3, "bridged depth {z}");
            }
        }
    }

    #[test]
    fn same_camera_reproduces_varying_depth() {
        let Some(mut engine) = engine() else { return };
        let holes = [(5u32, 5u32), (20, 30), (40, 10)];
        let data = (0..H)
            .flat_map(|v| (0..W).map(move |u| 2.0 + 0.02 * u as f32 + 0.01 * v as f32))
            .collect();
        let mut depth = DepthMap::new(W, H, data).unwrap();
        depth.data[(5 * W + 5) as usize] = f32::NAN;
        depth.data[(30 * W + 20) as usize] = 0.0;
        depth.data[(10 * W + 40) as usize] = -1.0;
        engine.upload_bundle(&bundle(&depth)).unwrap();

        let mut out = RenderOutput::new();
        engine.render(&source(), &source(), NEAR, FAR, &mut out).unwrap();

        let mut covered = 0;
        for (i, &m) in out.mask.iter().enumerate() {
            if m != 0 {
                covered += 1;
                assert_relative_eq!(out.depth[i], depth.data[i], max_relative = 1e-3);
            }
        }
        assert!(covered > (W * H) as usize / 2, "only {covered} pixels covered");
        for (u, v) in holes {
            assert_eq!(out.mask[(v * W + u) as usize], 0, "hole ({u}, {v}) was filled");
        }
    }

    #[test]
    fn full_resolution_plane_round_trips() {
        let Some(mut engine) = engine() else { return };
        let (w, h) = (640u32, 480u32);
        let cam = Intrinsics::new(500.0, 500.0, 320.0, 240.0, w, h);
        let image = ColorImage::new(w, h, 3, vec![128; (w * h * 3) as usize]).unwrap();

        let mut b = DepthMesh::new();
        b.build(&image, &DepthMap::filled(w, h, 5.0), cam, DiscontinuityPolicy::default()).unwrap();
        assert_eq!(b.mesh().triangles.len(), (639 * 479 * 2) as usize);
        engine.upload_bundle(&b).unwrap();

        let mut out = RenderOutput::new();
        let stats = engine.render(&cam, &cam, NEAR, FAR, &mut out).unwrap();
        assert_eq!((out.width, out.height), (w, h));
        assert_eq!(stats.total_pixels, (w * h) as usize);
        let min = (639.0 * 479.0) / (640.0 * 480.0);
        assert!(stats.valid_fraction() >= min - 1e-4, "valid {}", stats.valid_fraction());
        for (i, &m) in out.mask.iter().enumerate() {
            if m != 0 {
                assert_relative_eq!(out.depth[i], 5.0, max_relative = 1e-4);
                assert_eq!(&out.rgb[i * 3..i * 3 + 3], &[128, 128, 128]);
            }
        }
    }

    #[test]
    fn render_before_upload_fails() {
        let Some(mut engine) = engine() else { return };
        let mut out = RenderOutput::new();
        let r = engine.render(&source(), &source(), NEAR, FAR, &mut out);
        assert_eq!(r, Err(RenderError::NotReady("mesh")));

        let mesh = bundle(&DepthMap::filled(W, H, 5.0)).mesh().clone();
        engine.upload_mesh(&mesh).unwrap();
        let r = engine.render(&source(), &source(), NEAR, FAR, &mut out);
        assert_eq!(r, Err(RenderError::NotReady("texture")));
    }

    #[test]
    fn empty_uploads_fail() {
        let Some(mut engine) = engine() else { return };
        let r = engine.upload_mesh(&Mesh::default());
        assert!(matches!(r, Err(RenderError::Backend(BackendError::EmptyUpload(_)))));
        let r = engine.upload_texture(&ColorImage::default());
        assert!(matches!(r, Err(RenderError::Backend(BackendError::EmptyUpload(_)))));
    }

    #[test]
    fn invalid_camera_is_rejected() {
        let Some(mut engine) = engine() else { return };
        engine.upload_bundle(&bundle(&DepthMap::filled(W, H, 5.0))).unwrap();
        let mut out = RenderOutput::new();
        engine.render(&source(), &source(), NEAR, FAR, &mut out).unwrap();
        assert!(!out.is_empty());

        let bad = Intrinsics::new(0.0, 60.0, 32.0, 24.0, W, H);
        let r = engine.render(&source(), &bad, NEAR, FAR, &mut out);
        assert!(matches!(r, Err(RenderError::Camera(_))));
        // Nothing from the previous render survives a failure.
        assert!(out.is_empty());
        assert!(out.mask.is_empty());

        let r = engine.render(&source(), &source(), 1.0, 0.5, &mut out);
        assert!(matches!(r, Err(RenderError::Camera(_))));

        // A failed render leaves the engine usable.
        assert!(engine.render(&source(), &source(), NEAR, FAR, &mut out).is_ok());
    }

    #[test]
    fn gpu_info_is_reported() {
        let Some(engine) = engine() else { return };
        assert!(!engine.gpu_info().is_empty());
    }
}
