use std::path::PathBuf;

use anyhow::{bail, ensure, Result};
use clap::{ArgAction, Args};
use refocal_engine::{DiscontinuityPolicy, Intrinsics};

pub const DEFAULT_FOCAL_SCALES: [f32; 5] = [0.5, 0.75, 1.0, 1.5, 2.0];

/// Options of `refocal render`.
///
/// Long flags also accept the underscore spelling (`--out_dir`, `--W_out`, ...).
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// RGB image (PNG, JPEG, BMP, TIFF).
    #[arg(long)]
    pub rgb: PathBuf,

    /// Depth map (.npy, .exr, or 8/16-bit image); see --depth-scale.
    #[arg(long)]
    pub depth: PathBuf,

    /// Output directory, created if missing.
    #[arg(long, alias = "out_dir", default_value = "./output")]
    pub out_dir: PathBuf,

    /// Focal length X in pixels.
    #[arg(long)]
    pub fx: f32,

    /// Focal length Y in pixels.
    #[arg(long)]
    pub fy: f32,

    /// Principal point X (default: image centre).
    #[arg(long)]
    pub cx: Option<f32>,

    /// Principal point Y (default: image centre).
    #[arg(long)]
    pub cy: Option<f32>,

    /// Factor converting stored depth to meters (0.001 for millimetres).
    #[arg(long, alias = "depth_scale", default_value_t = 1.0)]
    pub depth_scale: f32,

    /// Comma-separated focal scales.
    #[arg(long, alias = "focal_list", value_delimiter = ',', default_values_t = DEFAULT_FOCAL_SCALES)]
    pub focal_list: Vec<f32>,

    /// Relative depth discontinuity threshold.
    #[arg(long, alias = "tau_rel", default_value_t = 0.05)]
    pub tau_rel: f32,

    /// Absolute depth discontinuity threshold in meters.
    #[arg(long, alias = "tau_abs", default_value_t = 0.1)]
    pub tau_abs: f32,

    /// Near clipping plane in meters.
    #[arg(long, default_value_t = 0.1)]
    pub near: f32,

    /// Far clipping plane in meters.
    #[arg(long, default_value_t = 100.0)]
    pub far: f32,

    /// GPU adapter index (default: automatic).
    #[arg(long)]
    pub gpu: Option<usize>,

    /// Output width (default: input width).
    #[arg(long, alias = "W_out")]
    pub w_out: Option<u32>,

    /// Output height (default: input height).
    #[arg(long, alias = "H_out")]
    pub h_out: Option<u32>,

    /// Also save depth as float32 .npy.
    #[arg(long, alias = "save_npy")]
    pub save_npy: bool,

    /// Save depth as 16-bit millimetre PNG.
    #[arg(long, alias = "save_png", action = ArgAction::Set, default_value_t = true)]
    pub save_png: bool,

    /// Save float depth as OpenEXR (float TIFF if EXR encoding fails).
    #[arg(long, alias = "save_exr", action = ArgAction::Set, default_value_t = true)]
    pub save_exr: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.rgb.as_os_str().is_empty(), "RGB image path is required");
        ensure!(!self.depth.as_os_str().is_empty(), "depth map path is required");
        ensure!(
            self.fx.is_finite() && self.fy.is_finite() && self.fx > 0.0 && self.fy > 0.0,
            "focal length (fx, fy) must be positive"
        );
        ensure!(!self.focal_list.is_empty(), "at least one focal scale is required");
        if let Some(s) = self.focal_list.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            bail!("focal scale {s} must be positive");
        }
        ensure!(
            self.tau_rel > 0.0 && self.tau_abs > 0.0,
            "depth thresholds (tau_rel, tau_abs) must be positive"
        );
        ensure!(
            self.depth_scale.is_finite() && self.depth_scale > 0.0,
            "depth scale must be positive"
        );
        ensure!(
            self.near > 0.0 && self.far > 0.0 && self.near < self.far,
            "invalid near/far planes ({}, {})",
            self.near,
            self.far
        );
        ensure!(
            self.w_out != Some(0) && self.h_out != Some(0),
            "output resolution must be non-zero"
        );
        Ok(())
    }

    pub fn policy(&self) -> DiscontinuityPolicy {
        DiscontinuityPolicy::new(self.tau_rel, self.tau_abs)
    }

    /// Source camera for a `width x height` input; missing principal point
    /// coordinates default to the image centre.
    pub fn source_intrinsics(&self, width: u32, height: u32) -> Intrinsics {
        let center = Intrinsics::with_default_center(self.fx, self.fy, width, height);
        Intrinsics {
            cx: self.cx.unwrap_or(center.cx),
            cy: self.cy.unwrap_or(center.cy),
            ..center
        }
    }

    /// Output resolution; each missing dimension falls back to the input's.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        (self.w_out.unwrap_or(width), self.h_out.unwrap_or(height))
    }
}
