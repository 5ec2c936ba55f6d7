use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, RgbImage};
use refocal_engine::ColorImage;

/// Loads any format `image` decodes as 8-bit RGB.
pub fn load_rgb(path: &Path) -> Result<ColorImage> {
    let img = image::open(path).with_context(|| format!("failed to load RGB image {}", path.display()))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(ColorImage::new(width, height, 3, rgb.into_raw())?)
}

pub fn save_rgb(path: &Path, width: u32, height: u32, rgb: &[u8]) -> Result<()> {
    let img = RgbImage::from_raw(width, height, rgb.to_vec())
        .with_context(|| format!("RGB buffer does not match {width}x{height}"))?;
    img.save(path).with_context(|| format!("failed to save {}", path.display()))
}

/// Single-channel 8-bit image (masks).
pub fn save_gray(path: &Path, width: u32, height: u32, data: &[u8]) -> Result<()> {
    let img = GrayImage::from_raw(width, height, data.to_vec())
        .with_context(|| format!("gray buffer does not match {width}x{height}"))?;
    img.save(path).with_context(|| format!("failed to save {}", path.display()))
}
