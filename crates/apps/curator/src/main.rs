//! Curator - Command-line client for the favorites server
//!
//! This is the main entry point for the curator binary.

use clap::Parser;
use log::error;

mod cli;
mod commands;
mod render;

use cli::Cli;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    if let Err(e) = commands::run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
