mod backend;
mod cli;
mod model;
mod orchestrator;
mod runner;
mod storage;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_one_shot = args.is_one_shot();

    cli::run(args).await?;
    // Explicitly exit with code 0 in one-shot modes; the output writer has already flushed.
    if is_one_shot {
        std::process::exit(0);
    }
    Ok(())
}
