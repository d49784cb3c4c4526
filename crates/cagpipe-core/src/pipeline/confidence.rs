//! Confidence scoring heuristic

use crate::pipeline::ContextChunk;

/// Score returned when no context was retrieved; an answer with zero
/// grounding is capped low regardless of its content.
pub const NO_CONTEXT_FLOOR: f64 = 0.3;

/// Characters of answer length at which the length term saturates
const LENGTH_SATURATION_CHARS: f64 = 100.0;

/// Heuristic confidence score in [0, 1] for a generated answer
///
/// With no context, returns the fixed floor. Otherwise combines mean
/// context relevance (weight 0.7) with a capped answer-length term
/// (weight 0.3); answers past 100 characters gain no extra credit.
pub fn score_confidence(chunks: &[ContextChunk], answer: &str) -> f64 {
    if chunks.is_empty() {
        return NO_CONTEXT_FLOOR;
    }

    let avg_relevance =
        chunks.iter().map(|c| c.relevance_score).sum::<f64>() / chunks.len() as f64;
    let length_factor = (answer.len() as f64 / LENGTH_SATURATION_CHARS).min(1.0);

    (avg_relevance * 0.7 + length_factor * 0.3).clamp(0.0, 1.0)
}
