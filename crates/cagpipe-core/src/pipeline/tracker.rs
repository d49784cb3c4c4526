//! Process step tracking for pipeline observability
//!
//! A `StepTracker` is owned by exactly one pipeline run. The orchestrator
//! constructs a fresh tracker per request, so concurrent requests can
//! never interleave steps into the same list.

use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Instant;

/// Status of one tracked step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

/// One timed, named stage of a pipeline run
#[derive(Debug)]
pub struct ProcessStep {
    pub name: String,
    pub description: String,
    pub status: StepStatus,
    pub details: Map<String, Value>,
    started: Instant,
    duration_ms: Option<f64>,
}

impl ProcessStep {
    /// Duration in milliseconds; undefined while the step is running
    pub fn duration_ms(&self) -> Option<f64> {
        self.duration_ms
    }
}

/// Handle to a started step
///
/// Consumed by `complete_step` or `fail_step`, so a started step can
/// reach a terminal state at most once.
#[derive(Debug)]
pub struct StepHandle(usize);

/// Tracks the steps of one pipeline run
#[derive(Debug)]
pub struct StepTracker {
    technique: String,
    steps: Vec<ProcessStep>,
}

impl StepTracker {
    pub fn new(technique: impl Into<String>) -> Self {
        Self {
            technique: technique.into(),
            steps: Vec::new(),
        }
    }

    /// Start tracking a step
    pub fn start_step(&mut self, name: impl Into<String>, description: impl Into<String>) -> StepHandle {
        let name = name.into();
        tracing::info!("Started step: {}", name);
        self.steps.push(ProcessStep {
            name,
            description: description.into(),
            status: StepStatus::Running,
            details: Map::new(),
            started: Instant::now(),
            duration_ms: None,
        });
        StepHandle(self.steps.len() - 1)
    }

    /// Mark a step as completed
    pub fn complete_step(&mut self, handle: StepHandle, details: Option<Map<String, Value>>) {
        let step = &mut self.steps[handle.0];
        step.duration_ms = Some(step.started.elapsed().as_secs_f64() * 1000.0);
        step.status = StepStatus::Completed;
        if let Some(details) = details {
            step.details.extend(details);
        }
        tracing::info!(
            "Completed step: {} ({:.2}ms)",
            step.name,
            step.duration_ms.unwrap_or(0.0)
        );
    }

    /// Mark a step as failed
    pub fn fail_step(&mut self, handle: StepHandle, error: &str) {
        let step = &mut self.steps[handle.0];
        step.duration_ms = Some(step.started.elapsed().as_secs_f64() * 1000.0);
        step.status = StepStatus::Failed;
        step.details
            .insert("error".to_string(), Value::String(error.to_string()));
        tracing::error!("Failed step: {} - {}", step.name, error);
    }

    pub fn steps(&self) -> &[ProcessStep] {
        &self.steps
    }

    /// Serializable view of the run for callers
    pub fn visualization(&self) -> ProcessVisualization {
        ProcessVisualization {
            technique: self.technique.clone(),
            total_steps: self.steps.len(),
            total_duration_ms: self.steps.iter().filter_map(|s| s.duration_ms).sum(),
            steps: self
                .steps
                .iter()
                .map(|s| StepView {
                    name: s.name.clone(),
                    description: s.description.clone(),
                    duration_ms: s.duration_ms,
                    status: s.status,
                    details: s.details.clone(),
                })
                .collect(),
        }
    }
}

/// Visualization payload for one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct ProcessVisualization {
    pub technique: String,
    pub total_steps: usize,
    pub total_duration_ms: f64,
    pub steps: Vec<StepView>,
}

/// Serialized view of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub name: String,
    pub description: String,
    pub duration_ms: Option<f64>,
    pub status: StepStatus,
    pub details: Map<String, Value>,
}
