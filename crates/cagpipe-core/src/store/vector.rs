//! Knowledge store port and in-memory vector store
//!
//! Scores follow `1 - cosine distance` semantics: higher is more similar,
//! comparable across results of one query but not globally normalized.

use crate::error::{CagError, Result};
use crate::llm::GenerationClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One ranked search result from a knowledge store
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub content: String,
    pub score: f64,
    pub metadata: HashMap<String, String>,
}

/// Trait for knowledge stores serving similarity search
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search for similar documents, ordered by score descending
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<ScoredDocument>>;

    /// Add documents to the store
    async fn add_documents(
        &self,
        texts: Vec<String>,
        metadatas: Vec<HashMap<String, String>>,
        ids: Vec<String>,
    ) -> Result<()>;

    /// Delete documents by IDs
    async fn delete(&self, ids: &[String]) -> Result<()>;
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

struct StoredDocument {
    id: String,
    content: String,
    metadata: HashMap<String, String>,
    embedding: Vec<f32>,
}

/// In-memory vector store backed by an embedding client
pub struct MemoryVectorStore {
    embedder: Arc<dyn GenerationClient>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl MemoryVectorStore {
    pub fn new(embedder: Arc<dyn GenerationClient>) -> Self {
        Self {
            embedder,
            documents: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

fn matches_filter(metadata: &HashMap<String, String>, filter: &HashMap<String, String>) -> bool {
    filter
        .iter()
        .all(|(key, value)| metadata.get(key) == Some(value))
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<ScoredDocument>> {
        let query_embedding = self.embedder.embed(query).await?;

        let documents = self.documents.read().await;
        let mut scored: Vec<ScoredDocument> = documents
            .iter()
            .filter(|doc| filter.map_or(true, |f| matches_filter(&doc.metadata, f)))
            .map(|doc| ScoredDocument {
                content: doc.content.clone(),
                score: cosine_similarity(&query_embedding, &doc.embedding) as f64,
                metadata: doc.metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        tracing::debug!("Vector search returned {} results", scored.len());
        Ok(scored)
    }

    async fn add_documents(
        &self,
        texts: Vec<String>,
        metadatas: Vec<HashMap<String, String>>,
        ids: Vec<String>,
    ) -> Result<()> {
        if texts.len() != metadatas.len() || texts.len() != ids.len() {
            return Err(CagError::InvalidInput(format!(
                "Mismatched lengths: {} texts, {} metadatas, {} ids",
                texts.len(),
                metadatas.len(),
                ids.len()
            )));
        }

        let mut stored = Vec::with_capacity(texts.len());
        for ((text, metadata), id) in texts.into_iter().zip(metadatas).zip(ids) {
            let embedding = self.embedder.embed(&text).await?;
            stored.push(StoredDocument {
                id,
                content: text,
                metadata,
                embedding,
            });
        }

        let mut documents = self.documents.write().await;
        documents.extend(stored);
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut documents = self.documents.write().await;
        documents.retain(|doc| !ids.contains(&doc.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_matches_filter() {
        let mut metadata = HashMap::new();
        metadata.insert("kind".to_string(), "statute".to_string());

        let mut filter = HashMap::new();
        filter.insert("kind".to_string(), "statute".to_string());
        assert!(matches_filter(&metadata, &filter));

        filter.insert("year".to_string(), "2020".to_string());
        assert!(!matches_filter(&metadata, &filter));
    }
}
