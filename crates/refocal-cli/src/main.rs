mod cli;
mod config;
mod io;
mod pipeline;
mod sample;

use clap::Parser;
use refocal_engine::logging::{init_logging, LoggingConfig};

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_verbosity(cli.verbose));

    match &cli.command {
        Command::Render(config) => pipeline::run(config),
        Command::Sample(args) => sample::run(args),
    }
}
