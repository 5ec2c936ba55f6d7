//! Synthetic RGB-D scene for end-to-end smoke runs.

use std::fs;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Args;
use refocal_engine::{ColorImage, DepthMap};

use crate::io;

/// Options of `refocal sample`.
#[derive(Debug, Clone, Args)]
pub struct SampleArgs {
    /// Output directory, created if missing.
    #[arg(long, alias = "out_dir", default_value = "sample_data")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = 640)]
    pub width: u32,

    #[arg(long, default_value_t = 480)]
    pub height: u32,
}

const SKY_DEPTH: f32 = 8.0;
const TILE: u32 = 32;

const SKY: [u8; 3] = [100, 100, 150];
const GRASS: [u8; 3] = [80, 120, 80];
const RED: [u8; 3] = [200, 50, 50];
const BLUE: [u8; 3] = [50, 50, 200];
const YELLOW: [u8; 3] = [200, 200, 50];

/// Sky at 8 m, a ground ramp on the lower half, two spheres and a box.
///
/// Colours are darkened on alternate `TILE`-pixel squares so zoomed renders show
/// texture detail.
pub fn generate_scene(width: u32, height: u32) -> (ColorImage, DepthMap) {
    let (w, h) = (width as f32, height as f32);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    let mut depth = Vec::with_capacity(width as usize * height as usize);

    for v in 0..height {
        for u in 0..width {
            let (x, y) = (u as f32 - cx, v as f32 - cy);
            let mut z = SKY_DEPTH;
            let mut color = SKY;

            if v > height / 2 {
                z = (SKY_DEPTH - 2.0 * (v as f32 - cy) / h).max(1.5);
                color = GRASS;
            }

            // Left sphere hides whatever is behind it.
            if let Some(offset) = sphere_offset(x + w / 4.0, y, h / 5.0) {
                z = 3.0 - 0.8 * offset;
                color = RED;
            }
            if let Some(offset) = sphere_offset(x - w / 4.0, y - h / 8.0, h / 6.0) {
                let zs = 2.0 - 0.6 * offset;
                if zs < z {
                    z = zs;
                    color = BLUE;
                }
            }
            let box_z = 4.0;
            if x.abs() < w / 8.0 && (y - h / 4.0).abs() < h / 6.0 && box_z < z {
                z = box_z;
                color = YELLOW;
            }

            let dark = ((u / TILE) + (v / TILE)) % 2 == 1;
            rgb.extend(color.map(|c| if dark { (c as u16 * 3 / 4) as u8 } else { c }));
            depth.push(z);
        }
    }

    (
        ColorImage { width, height, channels: 3, data: rgb },
        DepthMap { width, height, data: depth },
    )
}

/// Normalized bulge `sqrt(r^2 - d^2) / r` inside a disc of radius `r`.
fn sphere_offset(dx: f32, dy: f32, r: f32) -> Option<f32> {
    let d2 = dx * dx + dy * dy;
    (d2 < r * r).then(|| (r * r - d2).sqrt() / r)
}

/// Focal length matching a 500 px lens at 640 px width.
pub fn suggested_focal(width: u32) -> f32 {
    500.0 * width as f32 / 640.0
}

pub fn run(args: &SampleArgs) -> Result<()> {
    ensure!(args.width > 0 && args.height > 0, "sample size must be non-zero");
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create output directory {}", args.out_dir.display()))?;

    let (rgb, depth) = generate_scene(args.width, args.height);
    let rgb_path = args.out_dir.join("sample_rgb.png");
    let npy_path = args.out_dir.join("sample_depth.npy");
    let png_path = args.out_dir.join("sample_depth.png");

    io::image::save_rgb(&rgb_path, rgb.width, rgb.height, &rgb.data)?;
    io::depth::save_depth_npy(&npy_path, depth.width, depth.height, &depth.data)?;
    io::depth::save_depth_png(&png_path, depth.width, depth.height, &depth.data)?;
    log::info!("saved {}, {} and {}", rgb_path.display(), npy_path.display(), png_path.display());

    let f = suggested_focal(args.width);
    log::info!(
        "try: refocal render --rgb {} --depth {} --fx {f} --fy {f}",
        rgb_path.display(),
        npy_path.display()
    );
    log::info!(
        "  or: refocal render --rgb {} --depth {} --depth-scale 0.001 --fx {f} --fy {f}",
        rgb_path.display(),
        png_path.display()
    );
    Ok(())
}
