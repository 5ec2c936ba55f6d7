//! `refocal render`: load, mesh once, render every focal scale.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use refocal_engine::{DepthMesh, Intrinsics, RenderOutput, Rerenderer};

use crate::config::Config;
use crate::io;

pub fn run(config: &Config) -> Result<()> {
    config.validate()?;
    let started = Instant::now();

    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("cannot create output directory {}", config.out_dir.display()))?;

    let rgb = io::image::load_rgb(&config.rgb)?;
    let depth = io::depth::load_depth(&config.depth, config.depth_scale)?;
    log::info!(
        "loaded {} ({}x{}) and {} ({}x{})",
        config.rgb.display(),
        rgb.width,
        rgb.height,
        config.depth.display(),
        depth.width,
        depth.height
    );

    let source = config.source_intrinsics(depth.width, depth.height);
    let mut bundle = DepthMesh::new();
    bundle
        .build(&rgb, &depth, source, config.policy())
        .context("failed to build depth mesh")?;

    let mut engine = Rerenderer::initialize(config.gpu).context("failed to initialize renderer")?;
    engine.upload_bundle(&bundle).context("failed to upload mesh")?;

    let output_size = config.output_size(depth.width, depth.height);
    let mut output = RenderOutput::new();
    let mut rendered = 0usize;
    for &scale in &config.focal_list {
        let target = source.for_focal_scale(scale, Some(output_size));
        match render_scale(&mut engine, config, &source, &target, scale, &mut output) {
            Ok(()) => rendered += 1,
            Err(e) => log::error!("scale {scale:.2} failed: {e:#}"),
        }
    }

    log::info!(
        "rendered {rendered}/{} scales into {} in {:.2?}",
        config.focal_list.len(),
        config.out_dir.display(),
        started.elapsed()
    );
    Ok(())
}

fn render_scale(
    engine: &mut Rerenderer,
    config: &Config,
    source: &Intrinsics,
    target: &Intrinsics,
    scale: f32,
    output: &mut RenderOutput,
) -> Result<()> {
    log::info!(
        "scale {scale:.2}: {}x{}, fx {:.1} fy {:.1}",
        target.width,
        target.height,
        target.fx,
        target.fy
    );
    engine.render(source, target, config.near, config.far, output)?;
    save_output(&config.out_dir, scale, output, DepthFiles::from(config))
}

/// Output file stem for one scale, e.g. `scale_1.50`.
pub fn scale_stem(scale: f32) -> String {
    format!("scale_{scale:.2}")
}

fn output_path(dir: &Path, scale: f32, suffix: &str) -> PathBuf {
    dir.join(format!("{}_{suffix}", scale_stem(scale)))
}

/// Depth encodings written next to every rendered view.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DepthFiles {
    /// 16-bit millimetre PNG.
    pub png: bool,
    /// Float OpenEXR.
    pub exr: bool,
    /// Float32 NPY.
    pub npy: bool,
}

impl From<&Config> for DepthFiles {
    fn from(config: &Config) -> Self {
        Self { png: config.save_png, exr: config.save_exr, npy: config.save_npy }
    }
}

/// Writes RGB and mask always, plus each requested depth encoding.
pub fn save_output(dir: &Path, scale: f32, out: &RenderOutput, depth: DepthFiles) -> Result<()> {
    let (w, h) = (out.width, out.height);
    io::image::save_rgb(&output_path(dir, scale, "rgb.png"), w, h, &out.rgb)?;
    io::image::save_gray(&output_path(dir, scale, "mask.png"), w, h, &out.mask)?;
    if depth.png {
        io::depth::save_depth_png(&output_path(dir, scale, "depth.png"), w, h, &out.depth)?;
    }
    if depth.exr {
        io::depth::save_depth_exr(&output_path(dir, scale, "depth.exr"), w, h, &out.depth)?;
    }
    if depth.npy {
        io::depth::save_depth_npy(&output_path(dir, scale, "depth.npy"), w, h, &out.depth)?;
    }
    log::debug!("saved {} outputs", scale_stem(scale));
    Ok(())
}
