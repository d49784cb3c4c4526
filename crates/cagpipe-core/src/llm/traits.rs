//! Generation service port

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token accounting for one generation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total: prompt_tokens + completion_tokens,
        }
    }

    /// Accumulate usage from another call into this one
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total += other.total;
    }
}

/// Sampling parameters for one generation call
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            system_prompt: None,
        }
    }
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// Trait for text generation service clients
///
/// The pipeline only depends on this contract; concrete backends
/// (Ollama, vLLM, mocks in tests) are injected at construction time.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text from a prompt, returning the text and token usage
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<(String, TokenUsage)>;

    /// Generate an embedding vector for text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get model name
    fn model_name(&self) -> &str;
}
