mod auth;
mod cli;
mod clock;
mod collector;
mod config;
mod error;
mod insights;
mod metrics;
mod output;
mod providers;
mod report;
mod window;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting LeadLens - Delivery Metrics Tool");
    cli.execute().await?;

    Ok(())
}
