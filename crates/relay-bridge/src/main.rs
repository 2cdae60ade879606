mod bootstrap_helpers;
mod startup_config;

use anyhow::Result;
use clap::Parser;
use relay_cli::Cli;

use crate::bootstrap_helpers::init_tracing;
use crate::startup_config::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    run_cli(cli).await
}
