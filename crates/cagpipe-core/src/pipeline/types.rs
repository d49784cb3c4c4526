//! Pipeline request and response types

use crate::llm::TokenUsage;
use crate::pipeline::tracker::ProcessVisualization;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// One pipeline request; immutable once built
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub context_limit: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub metadata: HashMap<String, String>,
}

impl QueryRequest {
    /// Create a request with default parameters; every instance gets its
    /// own empty metadata map
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            session_id: None,
            context_limit: 5,
            temperature: 0.7,
            max_tokens: 1000,
            metadata: HashMap::new(),
        }
    }

    pub fn with_context_limit(mut self, context_limit: usize) -> Self {
        self.context_limit = context_limit;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_session(mut self, user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.session_id = Some(session_id.into());
        self
    }
}

/// One retrieved unit of supporting context
///
/// Produced by a retrieval strategy and read-only thereafter. Relevance
/// scores are comparable across chunks of one request, not globally
/// normalized. Order within a response is retrieval order.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    pub content: String,
    pub source: String,
    pub relevance_score: f64,
    pub metadata: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl ContextChunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>, relevance_score: f64) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            relevance_score,
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The assembled answer for one request
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub answer: String,
    pub context_chunks: Vec<ContextChunk>,
    pub reasoning_steps: Vec<String>,
    pub confidence_score: f64,
    pub latency_ms: f64,
    pub token_usage: TokenUsage,
    pub technique: String,
    pub process: ProcessVisualization,
}
