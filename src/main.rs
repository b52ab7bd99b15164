mod analyzer;
mod cli;
mod config;
mod error;
mod patterns;
mod report;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting LogTriage - CI Failure Log Analyzer");
    cli.execute().await?;

    Ok(())
}
