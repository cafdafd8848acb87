#![forbid(unsafe_code)]

pub mod adapters;
pub mod api;
pub mod app;
pub mod commands;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use clap::Parser;

use app::AppController;
use commands::Cli;

/// Parse the command line, initialize the application and run the command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize the application controller
    let controller = AppController::new()
        .map_err(|e| anyhow::anyhow!("Failed to initialize application: {}", e))?;

    commands::execute(cli, &controller).await
}
