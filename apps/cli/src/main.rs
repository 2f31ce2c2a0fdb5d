//! Runoff CLI — overland flow scenario runner.
//!
//! Orchestrates GRASS tool invocations to simulate surface water depth
//! from an elevation raster, with optional depth filtering and
//! provenance stamping on the output.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
