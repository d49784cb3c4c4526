//! Cagpipe Core Library
//!
//! Instrumented context-augmented generation (CAG) pipelines: retrieve
//! supporting context, fold it into a prompt, invoke a generation
//! service, and score the answer's confidence, with per-stage timing and
//! status recorded for every run.
//!
//! # Features
//! - Polymorphic `Technique` contract with threshold-vector, multi-hop
//!   graph and iterative agentic strategies
//! - Process step tracking with a serializable visualization payload
//! - Generation and knowledge store ports with injected clients
//! - Document chunking for ingestion

pub mod chunker;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod store;
pub mod strategies;

pub use chunker::{chunk_document, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use config::{Config, LlmServiceConfig, PipelineConfig};
pub use error::{CagError, Error, Result};
pub use llm::{ChatMessage, GenerationClient, GenerationOptions, OllamaClient, TokenUsage};
pub use pipeline::{
    score_confidence, ContextChunk, PipelineResponse, ProcessVisualization, QueryRequest,
    StepStatus, StepTracker, Technique, NO_CONTEXT_FLOOR,
};
pub use store::{
    seed_medical_graph, cosine_similarity, GraphStore, MemoryGraphStore, MemoryVectorStore,
    ScoredDocument, VectorStore,
};
pub use strategies::{
    extract_symptoms, AgentState, AgenticTechnique, CitedRagTechnique, GraphContextItem,
    MultiHopGraphTechnique, ReasoningStep, Reflection,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "cagpipe";
