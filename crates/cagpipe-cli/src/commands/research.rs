//! Iterative agentic research

use crate::app::{OutputFormat, ResearchArgs};
use crate::commands::render_response;
use anyhow::{bail, Result};
use cagpipe_core::{AgenticTechnique, OllamaClient, QueryRequest, Technique};
use std::sync::Arc;

pub async fn run(args: ResearchArgs, client: Arc<OllamaClient>, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    if query.is_empty() {
        bail!("No query given");
    }

    let technique = AgenticTechnique::new(client);

    let mut request = QueryRequest::new(query);
    if let Some(temperature) = args.temperature {
        request = request.with_temperature(temperature);
    }

    let response = technique.process(&request).await?;
    render_response(&response, format)
}
