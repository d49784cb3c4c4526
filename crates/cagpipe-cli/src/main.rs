//! Cagpipe CLI
//!
//! Run context-augmented generation pipelines against a local
//! generation service.

use anyhow::Result;
use cagpipe_core::{Config, OllamaClient};
use clap::Parser;
use std::sync::Arc;

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    // One client per process, shared by every technique
    let client = Arc::new(OllamaClient::new(config.llm_service.clone())?);

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, client, &config, cli.format).await,
        Commands::Diagnose(args) => commands::diagnose::run(args, client, cli.format).await,
        Commands::Research(args) => commands::research::run(args, client, cli.format).await,
        Commands::Chunk(args) => commands::chunk::run(args, &config, cli.format).await,
    }
}
