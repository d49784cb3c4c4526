//! Cited RAG over documents supplied on the command line

use crate::app::{AskArgs, OutputFormat};
use crate::commands::render_response;
use anyhow::{bail, Result};
use cagpipe_core::{
    chunk_document, CitedRagTechnique, Config, MemoryVectorStore, OllamaClient, QueryRequest,
    Technique, VectorStore,
};
use std::collections::HashMap;
use std::sync::Arc;

pub async fn run(
    args: AskArgs,
    client: Arc<OllamaClient>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let query = args.query.join(" ");
    if query.is_empty() {
        bail!("No query given");
    }

    let store = Arc::new(MemoryVectorStore::new(client.clone()));

    for path in &args.docs {
        let document = std::fs::read_to_string(path)?;
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let chunks = chunk_document(
            &document,
            config.pipeline.chunk_size,
            config.pipeline.chunk_overlap,
        )?;
        tracing::info!("Ingested {} chunks from {}", chunks.len(), path.display());

        let metadatas = chunks
            .iter()
            .map(|_| HashMap::from([("title".to_string(), title.clone())]))
            .collect();
        let ids = (0..chunks.len())
            .map(|i| format!("{}#{}", title, i))
            .collect();
        store.add_documents(chunks, metadatas, ids).await?;
    }

    let technique = match args.min_relevance {
        Some(min_relevance) => {
            CitedRagTechnique::new(client, store).with_min_relevance(min_relevance)
        }
        None => CitedRagTechnique::new(client, store)
            .with_min_relevance(config.pipeline.min_relevance),
    };

    let request = QueryRequest::new(query).with_context_limit(args.limit);
    let response = technique.process(&request).await?;
    render_response(&response, format)
}
