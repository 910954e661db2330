//! Planner decision parsing. The planning model's reply goes through the output
//! normalizer and must name exactly one of an action or a final answer.

use serde::Deserialize;
use serde_json::Value;

use crate::llm_client::normalize::{normalize, AnalysisParseError};

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerDecision {
    Act {
        thought: String,
        capability: String,
        arguments: Value,
    },
    Finish {
        thought: String,
        answer: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    thought: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    arguments: Value,
    #[serde(default)]
    final_answer: Option<Value>,
}

/// Parses planner output. Errors keep the exact model text for the transcript.
pub fn parse_decision(text: &str) -> Result<PlannerDecision, AnalysisParseError> {
    let raw: RawDecision = normalize(text)?;
    let reject = |reason: &str| AnalysisParseError {
        raw: text.to_string(),
        reason: reason.to_string(),
    };

    let action = raw
        .action
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());
    let answer = raw.final_answer.filter(|v| !v.is_null()).map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    });

    match (action, answer) {
        (Some(capability), None) => Ok(PlannerDecision::Act {
            thought: raw.thought,
            capability,
            arguments: raw.arguments,
        }),
        (None, Some(answer)) => Ok(PlannerDecision::Finish {
            thought: raw.thought,
            answer,
        }),
        (Some(_), Some(_)) => Err(reject(
            "response has both 'action' and 'final_answer'; give exactly one",
        )),
        (None, None) => Err(reject(
            "response has neither 'action' nor 'final_answer'",
        )),
    }
}
