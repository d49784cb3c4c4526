//! Pipeline orchestration
//!
//! A retrieval technique implements the three stage methods; the provided
//! `process` drives retrieve, augment, generate and score for one request,
//! tracking every stage. Stage failures are annotated on the step and
//! re-raised wrapped with the stage name; no partial response is returned.

mod confidence;
mod tracker;
mod types;

pub use confidence::{score_confidence, NO_CONTEXT_FLOOR};
pub use tracker::{ProcessStep, ProcessVisualization, StepStatus, StepTracker, StepView};
pub use types::{ContextChunk, PipelineResponse, QueryRequest};

use crate::error::Result;
use crate::llm::TokenUsage;
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;

/// A context-augmented generation technique
///
/// The unit of variation in the pipeline: concrete strategies implement
/// the three stage methods and may override `confidence` (documenting the
/// override's formula). `process` is the orchestrator and should not be
/// overridden.
#[async_trait]
pub trait Technique: Send + Sync {
    /// Technique name, used in step tracking and the response
    fn name(&self) -> &str;

    /// Stage 1: retrieve relevant context for the query
    async fn retrieve_context(&self, request: &QueryRequest) -> Result<Vec<ContextChunk>>;

    /// Stage 2: fold retrieved context into a generation prompt
    async fn augment_context(
        &self,
        request: &QueryRequest,
        chunks: &[ContextChunk],
    ) -> Result<String>;

    /// Stage 3: generate the answer from the augmented prompt
    async fn generate_response(
        &self,
        prompt: &str,
        request: &QueryRequest,
    ) -> Result<(String, TokenUsage)>;

    /// Confidence in [0, 1] for the generated answer; defaults to the
    /// shared heuristic
    fn confidence(&self, chunks: &[ContextChunk], answer: &str) -> f64 {
        score_confidence(chunks, answer)
    }

    /// Additional human-readable reasoning steps recorded during the run
    fn reasoning_log(&self) -> Vec<String> {
        Vec::new()
    }

    /// Run the full pipeline for one request
    ///
    /// Owns a fresh `StepTracker` for this run; tracker state is attached
    /// to the response and discarded. Stage errors are recorded on the
    /// failing step and propagated wrapped with the stage name.
    async fn process(&self, request: &QueryRequest) -> Result<PipelineResponse> {
        let run_started = Instant::now();
        let mut tracker = StepTracker::new(self.name());
        let mut reasoning_steps = Vec::new();

        // Stage 1: retrieve
        let step = tracker.start_step("retrieve_context", "Retrieving relevant context");
        let chunks = match self.retrieve_context(request).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracker.fail_step(step, &e.to_string());
                return Err(e.in_stage("retrieve_context"));
            }
        };
        let avg_relevance = if chunks.is_empty() {
            0.0
        } else {
            chunks.iter().map(|c| c.relevance_score).sum::<f64>() / chunks.len() as f64
        };
        let mut details = serde_json::Map::new();
        details.insert("num_chunks".to_string(), json!(chunks.len()));
        details.insert("avg_relevance".to_string(), json!(avg_relevance));
        tracker.complete_step(step, Some(details));
        reasoning_steps.push(format!("Retrieved {} relevant context chunks", chunks.len()));

        // Stage 2: augment
        let step = tracker.start_step("augment_context", "Augmenting query with context");
        let prompt = match self.augment_context(request, &chunks).await {
            Ok(prompt) => prompt,
            Err(e) => {
                tracker.fail_step(step, &e.to_string());
                return Err(e.in_stage("augment_context"));
            }
        };
        let mut details = serde_json::Map::new();
        details.insert("prompt_length".to_string(), json!(prompt.len()));
        tracker.complete_step(step, Some(details));
        reasoning_steps.push("Augmented query with retrieved context".to_string());

        // Stage 3: generate
        let step = tracker.start_step("generate_response", "Generating response with LLM");
        let (answer, token_usage) = match self.generate_response(&prompt, request).await {
            Ok(result) => result,
            Err(e) => {
                tracker.fail_step(step, &e.to_string());
                return Err(e.in_stage("generate_response"));
            }
        };
        let mut details = serde_json::Map::new();
        details.insert("token_usage".to_string(), json!(token_usage));
        details.insert("answer_length".to_string(), json!(answer.len()));
        tracker.complete_step(step, Some(details));
        reasoning_steps.push(format!(
            "Generated response using {} tokens",
            token_usage.total
        ));
        reasoning_steps.extend(self.reasoning_log());

        let confidence_score = self.confidence(&chunks, &answer);
        let latency_ms = run_started.elapsed().as_secs_f64() * 1000.0;

        Ok(PipelineResponse {
            answer,
            context_chunks: chunks,
            reasoning_steps,
            confidence_score,
            latency_ms,
            token_usage,
            technique: self.name().to_string(),
            process: tracker.visualization(),
        })
    }
}
