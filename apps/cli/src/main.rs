//! BountyScout CLI: incremental bounty listing crawler.
//!
//! Discovers new listings from the catalog API, extracts descriptions and
//! prize tables from each listing page, and keeps a merged dataset.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
