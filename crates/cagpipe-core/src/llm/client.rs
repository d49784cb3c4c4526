//! HTTP client for Ollama-compatible generation services

use crate::config::LlmServiceConfig;
use crate::error::{CagError, Result};
use crate::llm::{GenerationClient, GenerationOptions, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Ollama-compatible client
pub struct OllamaClient {
    http_client: reqwest::Client,
    config: LlmServiceConfig,
}

impl OllamaClient {
    /// Create new client from configuration
    pub fn new(config: LlmServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CagError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LlmServiceConfig::default())
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            req.header("Authorization", format!("Bearer {}", api_key))
        } else {
            req
        }
    }

    /// Send a request with bounded retry on transient failures
    ///
    /// Retries timeouts, HTTP 429 and 5xx with exponential backoff. A
    /// timeout that survives all retries surfaces as `CagError::Timeout`
    /// so the failing stage can be marked accordingly.
    async fn send_with_retry(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let req = request
                .try_clone()
                .ok_or_else(|| CagError::Generation("Failed to clone request".to_string()))?;

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    let transient = status.as_u16() == 429 || status.is_server_error();
                    if transient && retries < MAX_RETRIES {
                        tracing::warn!(
                            "LLM service returned {}. Retrying in {}ms (attempt {}/{})",
                            status,
                            backoff_ms,
                            retries + 1,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        retries += 1;
                        backoff_ms *= 2;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) if e.is_timeout() => {
                    if retries < MAX_RETRIES {
                        tracing::warn!(
                            "Request timeout. Retrying in {}ms (attempt {}/{})",
                            backoff_ms,
                            retries + 1,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        retries += 1;
                        backoff_ms *= 2;
                    } else {
                        return Err(CagError::Timeout(format!(
                            "LLM service did not respond within {}s after {} attempts",
                            self.config.timeout_secs,
                            MAX_RETRIES + 1
                        )));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<(String, TokenUsage)> {
        #[derive(Serialize)]
        struct ChatOptions {
            temperature: f32,
            num_predict: u32,
        }

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            stream: bool,
            options: ChatOptions,
        }

        #[derive(Deserialize)]
        struct ChatResponseMessage {
            content: String,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            message: ChatResponseMessage,
            #[serde(default)]
            prompt_eval_count: u32,
            #[serde(default)]
            eval_count: u32,
        }

        let mut messages = Vec::new();
        if let Some(ref system_prompt) = options.system_prompt {
            messages.push(ChatMessage::system(system_prompt.clone()));
        }
        messages.push(ChatMessage::user(prompt));

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream: false,
            options: ChatOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.config.url);
        let req = self.authorized(self.http_client.post(&url).json(&request));

        let response = self.send_with_retry(req).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CagError::Generation(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(CagError::Http)?;

        let usage = TokenUsage::new(chat_response.prompt_eval_count, chat_response.eval_count);
        tracing::debug!(
            "Generated {} tokens with {}",
            usage.completion_tokens,
            self.config.model
        );

        Ok((chat_response.message.content, usage))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbedRequest {
            model: String,
            prompt: String,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            embedding: Vec<f32>,
        }

        let request = EmbedRequest {
            model: self.config.embedding_model.clone(),
            prompt: text.to_string(),
        };

        let url = format!("{}/api/embeddings", self.config.url);
        let req = self.authorized(self.http_client.post(&url).json(&request));

        let response = self.send_with_retry(req).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CagError::Generation(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(CagError::Http)?;
        Ok(embed_response.embedding)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let msg = ChatMessage::system("be precise");
        assert_eq!(msg.role, "system");
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn test_client_construction() {
        let client = OllamaClient::new(LlmServiceConfig {
            url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.model_name(), "llama3");
    }
}
