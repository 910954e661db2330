//! Transcript: the ordered record of planning decisions and invocation results for one task.
//!
//! Owned by the controller for the lifetime of a single task and rendered into every
//! planning prompt. Never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::controller::prompts::EMPTY_TRANSCRIPT;
use crate::errors::AppError;

/// Result of one capability invocation as the planner will see it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success(Value),
    Error(Value),
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocationRecord {
    pub capability: String,
    pub arguments: Value,
    pub outcome: InvocationOutcome,
    pub timestamp: DateTime<Utc>,
}

impl ToolInvocationRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Success(_))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    /// The planner's stated reasoning for the step that follows.
    Thought {
        text: String,
        timestamp: DateTime<Utc>,
    },
    Invocation(ToolInvocationRecord),
    /// A planning call that produced no usable decision.
    PlanningError {
        observation: Value,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn invocations(&self) -> impl Iterator<Item = &ToolInvocationRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            TranscriptEntry::Invocation(record) => Some(record),
            _ => None,
        })
    }

    pub fn record_thought(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.entries.push(TranscriptEntry::Thought {
            text: text.trim().to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn record_invocation(
        &mut self,
        capability: &str,
        arguments: Value,
        result: &Result<Value, AppError>,
    ) {
        let outcome = match result {
            Ok(value) => InvocationOutcome::Success(value.clone()),
            Err(err) => InvocationOutcome::Error(err.to_observation()),
        };
        self.entries.push(TranscriptEntry::Invocation(ToolInvocationRecord {
            capability: capability.to_string(),
            arguments,
            outcome,
            timestamp: Utc::now(),
        }));
    }

    pub fn record_planning_error(&mut self, err: &AppError) {
        self.entries.push(TranscriptEntry::PlanningError {
            observation: err.to_observation(),
            timestamp: Utc::now(),
        });
    }

    /// Plain-text rendering for the planning prompt.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return EMPTY_TRANSCRIPT.to_string();
        }

        let mut step = 0;
        let mut lines = Vec::new();
        for entry in &self.entries {
            match entry {
                TranscriptEntry::Thought { text, .. } => {
                    lines.push(format!("Thought: {text}"));
                }
                TranscriptEntry::Invocation(record) => {
                    step += 1;
                    lines.push(format!("Step {step}: called {}", record.capability));
                    lines.push(format!("Arguments: {}", record.arguments));
                    let observation = match &record.outcome {
                        InvocationOutcome::Success(value) => render_value(value),
                        InvocationOutcome::Error(value) => value.to_string(),
                    };
                    lines.push(format!("Observation: {observation}"));
                }
                TranscriptEntry::PlanningError { observation, .. } => {
                    step += 1;
                    lines.push(format!("Step {step}: your previous response was not usable"));
                    lines.push(format!("Observation: {observation}"));
                }
            }
        }
        lines.join("\n")
    }
}

/// Strings are shown raw so multi-line text (résumés, letters) stays readable.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
