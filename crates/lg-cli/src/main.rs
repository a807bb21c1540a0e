//! lineagegraph CLI - extract and query SQL data lineage

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{analyze, common, lineage, path};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    common::init_logging(cli.global.verbose);

    match &cli.command {
        cli::Commands::Analyze(args) => analyze::execute(args, &cli.global).await,
        cli::Commands::Lineage(args) => lineage::execute(args, &cli.global).await,
        cli::Commands::Path(args) => path::execute(args, &cli.global).await,
    }
}
