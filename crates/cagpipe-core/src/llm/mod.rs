//! Generation service port and clients

mod client;
mod traits;

pub use client::{ChatMessage, OllamaClient};
pub use traits::{GenerationClient, GenerationOptions, TokenUsage};
