//! Iterative agentic retrieval: plan, execute, reflect, refine
//!
//! Malformed LLM output tolerance is a first-class requirement here:
//! plan and reflection parsing are explicit attempts that fall back to
//! documented fixed values instead of failing the request.

use crate::error::Result;
use crate::llm::{GenerationClient, GenerationOptions, TokenUsage};
use crate::pipeline::{score_confidence, ContextChunk, QueryRequest, Technique};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Fallback plan used when the planning call returns malformed JSON
pub const FALLBACK_PLAN: [&str; 3] = [
    "Analyze query keywords",
    "Retrieve general context",
    "Synthesize specific answer",
];

/// Critique text used when the reflection call returns malformed JSON
pub const FALLBACK_CRITIQUE: &str = "Could not parse critique.";

/// Characters of a sub-call result kept in the reasoning log
const RESULT_PREVIEW_CHARS: usize = 200;

/// Nominal relevance assigned to step outputs used as context
const STEP_RELEVANCE: f64 = 0.75;

/// Agent lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Planning,
    Retrieving,
    Generating,
    Reflecting,
    Refining,
    Completed,
}

/// One logged sub-call of the agent loop
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningStep {
    pub step_id: usize,
    pub name: String,
    pub description: String,
    pub thought_process: String,
    pub result: String,
    pub status: String,
}

/// Self-critique of a generated answer
#[derive(Debug, Clone, Deserialize)]
pub struct Reflection {
    pub score: f64,
    pub critique: String,
    pub needs_improvement: bool,
}

impl Reflection {
    /// The documented parse-failure fallback: no improvement pass,
    /// mid-range score
    pub fn fallback() -> Self {
        Self {
            score: 5.0,
            critique: FALLBACK_CRITIQUE.to_string(),
            needs_improvement: false,
        }
    }
}

/// Extract the first JSON object from an LLM response
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

/// Parse a planning response; `None` means the caller should fall back
pub fn parse_plan(response: &str) -> Option<Vec<String>> {
    #[derive(Deserialize)]
    struct PlanPayload {
        steps: Vec<String>,
    }

    let payload: PlanPayload = serde_json::from_str(extract_json(response)?).ok()?;
    if payload.steps.is_empty() {
        return None;
    }
    Some(payload.steps)
}

/// Parse a reflection response; `None` means the caller should fall back
pub fn parse_reflection(response: &str) -> Option<Reflection> {
    serde_json::from_str(extract_json(response)?).ok()
}

fn preview(text: &str) -> String {
    if text.len() <= RESULT_PREVIEW_CHARS {
        return text.to_string();
    }
    let mut end = RESULT_PREVIEW_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Plan-execute-reflect-refine technique
///
/// Holds per-run state (reasoning log, accumulated usage, reflection);
/// one instance serves one request at a time. Construct a fresh instance
/// per request (construction is cheap, the client is a shared Arc).
pub struct AgenticTechnique {
    client: Arc<dyn GenerationClient>,
    state: Mutex<AgentState>,
    log: Mutex<Vec<ReasoningStep>>,
    usage: Mutex<TokenUsage>,
    reflection: Mutex<Option<Reflection>>,
}

impl AgenticTechnique {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            state: Mutex::new(AgentState::Planning),
            log: Mutex::new(Vec::new()),
            usage: Mutex::new(TokenUsage::default()),
            reflection: Mutex::new(None),
        }
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reasoning steps logged during the last run
    pub fn steps(&self) -> Vec<ReasoningStep> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_state(&self, state: AgentState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn push_step(&self, name: &str, description: &str, thought_process: String, result: String) {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        let step_id = log.len() + 1;
        log.push(ReasoningStep {
            step_id,
            name: name.to_string(),
            description: description.to_string(),
            thought_process,
            result: preview(&result),
            status: "completed".to_string(),
        });
    }

    fn track_usage(&self, usage: &TokenUsage) {
        self.usage
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .add(usage);
    }

    async fn call(&self, prompt: &str, request: &QueryRequest) -> Result<String> {
        let options = GenerationOptions::new(request.temperature, request.max_tokens);
        let (text, usage) = self.client.generate(prompt, &options).await?;
        self.track_usage(&usage);
        Ok(text)
    }

    /// Decompose the query into 3-4 research steps
    ///
    /// Falls back to the fixed generic plan on malformed output instead
    /// of failing the request.
    pub async fn plan(&self, request: &QueryRequest) -> Result<Vec<String>> {
        self.set_state(AgentState::Planning);
        let prompt = format!(
            "You are a research planner. Break down this query into 3-4 distinct research steps.\n\
             Query: {}\n\
             Return ONLY JSON format: {{ \"steps\": [ \"step 1\", \"step 2\", ... ] }}",
            request.query
        );

        let response = self.call(&prompt, request).await?;
        let steps = match parse_plan(&response) {
            Some(steps) => steps,
            None => {
                tracing::warn!("Planning response was not valid JSON, using fallback plan");
                FALLBACK_PLAN.iter().map(|s| s.to_string()).collect()
            }
        };

        self.push_step(
            "Planning",
            "Decompose query",
            format!("Breaking down '{}' into sub-tasks.", request.query),
            format!("{:?}", steps),
        );
        Ok(steps)
    }

    /// Execute one planned step with all prior step outputs as context
    pub async fn execute_step(
        &self,
        step_name: &str,
        request: &QueryRequest,
        prior_outputs: &[String],
    ) -> Result<String> {
        let context = prior_outputs.join("\n");
        let prompt = format!(
            "Perform this research step: {}\n\
             Context so far: {}\n\
             Goal for this step: Retrieve or derive information relevant to the main query: {}.",
            step_name, context, request.query
        );

        let response = self.call(&prompt, request).await?;
        self.push_step(
            "Execution",
            step_name,
            format!("Executing sub-task: {}", step_name),
            response.clone(),
        );
        Ok(response)
    }

    /// Critique the answer; falls back to `Reflection::fallback()` on
    /// malformed output
    pub async fn reflect(&self, request: &QueryRequest, answer: &str) -> Result<Reflection> {
        self.set_state(AgentState::Reflecting);
        let prompt = format!(
            "Critique this answer for accuracy, completeness, and clarity.\n\
             Query: {}\n\
             Answer: {}\n\
             Return ONLY JSON: {{ \"score\": <0-10>, \"critique\": \"...\", \"needs_improvement\": <bool> }}",
            request.query, answer
        );

        let response = self.call(&prompt, request).await?;
        let parsed = parse_reflection(&response);
        *self.reflection.lock().unwrap_or_else(|e| e.into_inner()) = parsed.clone();

        let reflection = parsed.unwrap_or_else(|| {
            tracing::warn!("Reflection response was not valid JSON, using fallback");
            Reflection::fallback()
        });

        self.push_step(
            "Reflection",
            "Self-Critique",
            "Evaluating answer quality.".to_string(),
            format!(
                "Score: {}, Issues: {}",
                reflection.score, reflection.critique
            ),
        );
        Ok(reflection)
    }

    /// Single refinement pass; only invoked when the critique asks for it
    pub async fn refine(
        &self,
        request: &QueryRequest,
        answer: &str,
        critique: &str,
    ) -> Result<String> {
        self.set_state(AgentState::Refining);
        let prompt = format!(
            "Refine this answer based on the critique.\n\
             Query: {}\n\
             Original Answer: {}\n\
             Critique: {}\n\
             Improved Answer:",
            request.query, answer, critique
        );

        let response = self.call(&prompt, request).await?;
        self.push_step(
            "Refinement",
            "Improve answer",
            "Applying critique to the answer.".to_string(),
            response.clone(),
        );
        Ok(response)
    }
}

#[async_trait]
impl Technique for AgenticTechnique {
    fn name(&self) -> &str {
        "agentic"
    }

    /// Plan the query and execute each step sequentially; each step sees
    /// the outputs of all steps before it
    async fn retrieve_context(&self, request: &QueryRequest) -> Result<Vec<ContextChunk>> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
        *self.usage.lock().unwrap_or_else(|e| e.into_inner()) = TokenUsage::default();
        *self.reflection.lock().unwrap_or_else(|e| e.into_inner()) = None;

        let plan = self.plan(request).await?;

        let mut outputs: Vec<String> = Vec::new();
        for step_name in &plan {
            self.set_state(AgentState::Retrieving);
            let output = self.execute_step(step_name, request, &outputs).await?;
            outputs.push(output);
        }

        let chunks = outputs
            .into_iter()
            .enumerate()
            .map(|(i, output)| {
                ContextChunk::new(output, format!("agent_step_{}", i + 1), STEP_RELEVANCE)
            })
            .collect();
        Ok(chunks)
    }

    async fn augment_context(
        &self,
        request: &QueryRequest,
        chunks: &[ContextChunk],
    ) -> Result<String> {
        self.set_state(AgentState::Generating);
        let findings = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(format!(
            "Synthesize a comprehensive answer for: \"{}\"\n\
             Based on these findings:\n\
             {}",
            request.query, findings
        ))
    }

    /// Synthesize, reflect, and apply at most one refinement pass
    async fn generate_response(
        &self,
        prompt: &str,
        request: &QueryRequest,
    ) -> Result<(String, TokenUsage)> {
        let answer = self.call(prompt, request).await?;

        let reflection = self.reflect(request, &answer).await?;
        let final_answer = if reflection.needs_improvement {
            self.refine(request, &answer, &reflection.critique).await?
        } else {
            answer
        };

        self.set_state(AgentState::Completed);
        let usage = *self.usage.lock().unwrap_or_else(|e| e.into_inner());
        Ok((final_answer, usage))
    }

    /// Confidence override: when the reflection parsed, use its score
    /// scaled from 0-10 into [0, 1]; otherwise the shared heuristic.
    fn confidence(&self, chunks: &[ContextChunk], answer: &str) -> f64 {
        match &*self.reflection.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(reflection) => (reflection.score / 10.0).clamp(0.0, 1.0),
            None => score_confidence(chunks, answer),
        }
    }

    fn reasoning_log(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|s| format!("{}: {}", s.name, s.thought_process))
            .collect()
    }
}
