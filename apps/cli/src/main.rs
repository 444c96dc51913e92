//! docsmith CLI: enhance markdown documentation and mine it for Q&A.
//!
//! Turns a directory of markdown files into one enhanced document, an FAQ,
//! and the raw Q&A pairs, plus a manifest describing the run.

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
