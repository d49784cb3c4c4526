//! Retrieval strategies implementing the pipeline `Technique` contract

mod agentic;
mod cited;
mod multihop;

pub use agentic::{
    parse_plan, parse_reflection, AgentState, AgenticTechnique, ReasoningStep, Reflection,
    FALLBACK_CRITIQUE, FALLBACK_PLAN,
};
pub use cited::{CitedRagTechnique, DEFAULT_MIN_RELEVANCE};
pub use multihop::{
    extract_symptoms, GraphContextItem, MultiHopGraphTechnique, HOP_COUNT, KNOWLEDGE_SOURCE,
};
