//! CLI command handlers

pub mod ask;
pub mod chunk;
pub mod diagnose;
pub mod research;

use crate::app::OutputFormat;
use anyhow::Result;
use cagpipe_core::PipelineResponse;

/// Print a pipeline response in the selected format
pub fn render_response(response: &PipelineResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        OutputFormat::Text => {
            println!("{}", response.answer);
            println!();
            println!(
                "-- {} | confidence {:.2} | {} tokens | {:.0}ms",
                response.technique,
                response.confidence_score,
                response.token_usage.total,
                response.latency_ms
            );
            for step in &response.reasoning_steps {
                println!("   {}", step);
            }
        }
    }
    Ok(())
}
