//! Threshold-vector retrieval with citation tracking

use crate::error::Result;
use crate::llm::{GenerationClient, GenerationOptions, TokenUsage};
use crate::pipeline::{ContextChunk, QueryRequest, Technique};
use crate::store::VectorStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Default minimum relevance score for retrieved context
pub const DEFAULT_MIN_RELEVANCE: f64 = 0.6;

const SYSTEM_PROMPT: &str = "You are an expert analyst. Provide accurate, well-cited analysis \
     based on the provided context. Always cite your sources using the provided citation numbers.";

/// Vector retrieval with a relevance threshold and 1-based citation markers
///
/// Results below `min_relevance` are discarded; each surviving chunk gets
/// a citation identifier (`[1]`, `[2]`, ...) in retrieval order, and the
/// prompt instructs the model to cite by marker number.
pub struct CitedRagTechnique {
    client: Arc<dyn GenerationClient>,
    store: Arc<dyn VectorStore>,
    min_relevance: f64,
}

impl CitedRagTechnique {
    pub fn new(client: Arc<dyn GenerationClient>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            client,
            store,
            min_relevance: DEFAULT_MIN_RELEVANCE,
        }
    }

    pub fn with_min_relevance(mut self, min_relevance: f64) -> Self {
        self.min_relevance = min_relevance;
        self
    }
}

#[async_trait]
impl Technique for CitedRagTechnique {
    fn name(&self) -> &str {
        "cited_rag"
    }

    async fn retrieve_context(&self, request: &QueryRequest) -> Result<Vec<ContextChunk>> {
        let results = self
            .store
            .search(&request.query, request.context_limit, None)
            .await?;

        let mut chunks = Vec::new();
        for result in results {
            if result.score < self.min_relevance {
                continue;
            }
            let source = result
                .metadata
                .get("title")
                .cloned()
                .unwrap_or_else(|| "Unknown Document".to_string());

            let mut metadata = result.metadata;
            metadata.insert(
                "citation_id".to_string(),
                format!("[{}]", chunks.len() + 1),
            );

            chunks.push(
                ContextChunk::new(result.content, source, result.score).with_metadata(metadata),
            );
        }

        tracing::info!("Retrieved {} relevant contexts", chunks.len());
        Ok(chunks)
    }

    async fn augment_context(
        &self,
        request: &QueryRequest,
        chunks: &[ContextChunk],
    ) -> Result<String> {
        let mut context_text = String::from("## Relevant Context:\n\n");

        if chunks.is_empty() {
            context_text.push_str("No supporting context was retrieved for this query.\n\n");
        }
        for (i, chunk) in chunks.iter().enumerate() {
            context_text.push_str(&format!("[{}] **{}**\n{}\n\n", i + 1, chunk.source, chunk.content));
        }

        Ok(format!(
            "You are an analysis assistant. Analyze the following query using the provided context.\n\
             \n\
             {}\
             ## Query:\n\
             {}\n\
             \n\
             ## Instructions:\n\
             1. Provide a comprehensive analysis based on the context provided\n\
             2. Cite sources using the citation numbers [1], [2], etc. when referencing specific information\n\
             3. If the context doesn't fully answer the query, acknowledge the limitations\n\
             4. Use precise terminology\n\
             5. Structure your response clearly with relevant sections\n\
             \n\
             ## Analysis:",
            context_text, request.query
        ))
    }

    async fn generate_response(
        &self,
        prompt: &str,
        request: &QueryRequest,
    ) -> Result<(String, TokenUsage)> {
        let options = GenerationOptions::new(request.temperature, request.max_tokens)
            .with_system_prompt(SYSTEM_PROMPT);
        self.client.generate(prompt, &options).await
    }
}
