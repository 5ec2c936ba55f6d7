use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use refocal_engine::frame::is_valid_depth;
use refocal_engine::DepthMap;

use super::npy;

/// Metres to stored millimetres in a 16-bit depth PNG.
pub const DEPTH_PNG_SCALE: f32 = 1000.0;

/// Loads a depth map and multiplies it by `scale`.
///
/// `.npy` arrays are read as-is. Anything else goes through `image` and keeps the
/// raw first-channel values (16-bit PNG counts, EXR floats) without normalization.
pub fn load_depth(path: &Path, scale: f32) -> Result<DepthMap> {
    let is_npy = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("npy"));

    let mut depth = if is_npy {
        let arr = npy::read(path)?;
        let width = u32::try_from(arr.cols).context("npy depth map is too wide")?;
        let height = u32::try_from(arr.rows).context("npy depth map is too tall")?;
        DepthMap::new(width, height, arr.data)?
    } else {
        load_depth_image(path)?
    };
    ensure!(!depth.is_empty(), "depth map {} is empty", path.display());

    depth.scale_in_place(scale);
    Ok(depth)
}

fn load_depth_image(path: &Path) -> Result<DepthMap> {
    let img = image::open(path).with_context(|| format!("failed to load depth {}", path.display()))?;
    let (width, height) = (img.width(), img.height());
    let channels = img.color().channel_count() as usize;

    let data: Vec<f32> = if let Some(s) = img.as_flat_samples_u8() {
        s.samples.iter().step_by(channels).map(|&v| f32::from(v)).collect()
    } else if let Some(s) = img.as_flat_samples_u16() {
        s.samples.iter().step_by(channels).map(|&v| f32::from(v)).collect()
    } else if let Some(s) = img.as_flat_samples_f32() {
        s.samples.iter().step_by(channels).copied().collect()
    } else {
        bail!("unsupported depth pixel format {:?} in {}", img.color(), path.display());
    };
    Ok(DepthMap::new(width, height, data)?)
}

/// Millimetre encoding for 16-bit PNG; invalid depth maps to 0.
pub fn depth_to_mm(z: f32) -> u16 {
    if is_valid_depth(z) {
        (z * DEPTH_PNG_SCALE).round().min(u16::MAX as f32) as u16
    } else {
        0
    }
}

pub fn save_depth_png(path: &Path, width: u32, height: u32, depth: &[f32]) -> Result<()> {
    let mm: Vec<u16> = depth.iter().map(|&z| depth_to_mm(z)).collect();
    let img = ImageBuffer::<Luma<u16>, _>::from_raw(width, height, mm)
        .with_context(|| format!("depth buffer does not match {width}x{height}"))?;
    img.save(path).with_context(|| format!("failed to save {}", path.display()))
}

/// Writes float depth as a 3-channel OpenEXR image, Z replicated in every
/// channel. Falls back to float TIFF next to `path` when EXR encoding fails.
///
/// Returns the path actually written.
pub fn save_depth_exr(path: &Path, width: u32, height: u32, depth: &[f32]) -> Result<PathBuf> {
    let rgb: Vec<f32> = depth.iter().flat_map(|&z| [z, z, z]).collect();
    let img = ImageBuffer::<Rgb<f32>, _>::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb32F)
        .with_context(|| format!("depth buffer does not match {width}x{height}"))?;

    match img.save_with_format(path, ImageFormat::OpenExr) {
        Ok(()) => Ok(path.to_path_buf()),
        Err(e) => {
            let fallback = path.with_extension("tiff");
            log::warn!("EXR write to {} failed ({e}), saving {} instead", path.display(), fallback.display());
            img.save_with_format(&fallback, ImageFormat::Tiff)
                .with_context(|| format!("failed to save {}", fallback.display()))?;
            Ok(fallback)
        }
    }
}

pub fn save_depth_npy(path: &Path, width: u32, height: u32, depth: &[f32]) -> Result<()> {
    npy::write_f32(path, height as usize, width as usize, depth)
}
