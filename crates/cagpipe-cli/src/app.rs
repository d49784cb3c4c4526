//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cagpipe")]
#[command(
    author,
    version,
    about = "Instrumented context-augmented generation pipelines"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a query with cited document retrieval
    Ask(AskArgs),

    /// Diagnose symptoms via multi-hop graph reasoning
    Diagnose(DiagnoseArgs),

    /// Research a query with the iterative agent
    Research(ResearchArgs),

    /// Split a document into overlapping chunks
    Chunk(ChunkArgs),
}

#[derive(Args)]
pub struct AskArgs {
    /// The query to answer
    pub query: Vec<String>,

    /// Document files to retrieve from
    #[arg(long = "doc", value_name = "FILE")]
    pub docs: Vec<PathBuf>,

    /// Number of context chunks to retrieve
    #[arg(short = 'n', long, default_value = "5")]
    pub limit: usize,

    /// Minimum relevance score for retrieved context
    #[arg(long)]
    pub min_relevance: Option<f64>,
}

#[derive(Args)]
pub struct DiagnoseArgs {
    /// Symptom description
    pub query: Vec<String>,

    /// Number of graph items to retrieve per hop group
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ResearchArgs {
    /// The query to research
    pub query: Vec<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,
}

#[derive(Args)]
pub struct ChunkArgs {
    /// File to chunk
    pub file: PathBuf,

    /// Maximum characters per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters of overlap between consecutive chunks
    #[arg(long)]
    pub overlap: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
