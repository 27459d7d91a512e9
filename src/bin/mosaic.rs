//! Mosaic CLI Binary
//!
//! Command-line interface for the mosaic layout engine.

use clap::Parser;
use mosaic::cli::{build_logging_config, Cli, RunContext};
use mosaic::logging::init_logging;
use std::process;
use tracing::{debug, error};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&cli) {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let context = RunContext::new(cli.workspace.clone(), cli.config.clone())?;
    debug!("CLI context initialized");
    let output = context.execute(&cli.command)?;
    println!("{}", output);
    Ok(())
}
