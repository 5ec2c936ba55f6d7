use clap::{ArgAction, Parser, Subcommand};

use crate::config::Config;
use crate::sample::SampleArgs;

/// Re-render RGB-D frames with different focal lengths from the same viewpoint.
#[derive(Debug, Parser)]
#[command(name = "refocal", version, about)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG is honoured otherwise.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a mesh from RGB + depth and render it at each focal scale.
    Render(Config),
    /// Write a synthetic RGB-D scene for smoke tests.
    Sample(SampleArgs),
}
