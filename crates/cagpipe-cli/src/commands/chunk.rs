//! Document chunking utility

use crate::app::{ChunkArgs, OutputFormat};
use anyhow::Result;
use cagpipe_core::{chunk_document, Config};

pub async fn run(args: ChunkArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let document = std::fs::read_to_string(&args.file)?;

    let chunk_size = args.chunk_size.unwrap_or(config.pipeline.chunk_size);
    let overlap = args.overlap.unwrap_or(config.pipeline.chunk_overlap);
    let chunks = chunk_document(&document, chunk_size, overlap)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&chunks)?);
        }
        OutputFormat::Text => {
            for (i, chunk) in chunks.iter().enumerate() {
                println!("--- chunk {} ({} chars) ---", i + 1, chunk.len());
                println!("{}", chunk);
                println!();
            }
        }
    }
    Ok(())
}
