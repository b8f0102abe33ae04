//! Inventory console - command-line driver

use inventory_console::cli;
use inventory_console::core::config::{CliArgs, Config};
use inventory_console::core::Logger;
use inventory_console::Console;

use anyhow::Result;
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration (CLI args, env vars, config file)
    let config = match Config::load(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let _logger = match Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Starting inventory console v{}", inventory_console::VERSION);

    let console = Console::new(&config)?;
    cli::run(&console, args.command).await
}
