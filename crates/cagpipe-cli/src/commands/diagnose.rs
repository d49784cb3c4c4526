//! Multi-hop graph diagnosis over the seeded medical graph

use crate::app::{DiagnoseArgs, OutputFormat};
use crate::commands::render_response;
use anyhow::{bail, Result};
use cagpipe_core::{seed_medical_graph, MultiHopGraphTechnique, OllamaClient, QueryRequest, Technique};
use std::sync::Arc;

pub async fn run(args: DiagnoseArgs, client: Arc<OllamaClient>, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    if query.is_empty() {
        bail!("No symptom description given");
    }

    let graph = Arc::new(seed_medical_graph()?);
    let technique = MultiHopGraphTechnique::new(client, graph);

    let request = QueryRequest::new(query).with_context_limit(args.limit);
    let response = technique.process(&request).await?;
    render_response(&response, format)
}
