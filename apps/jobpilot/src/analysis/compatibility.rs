//! Stage A: compatibility analysis between a résumé and a job description.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::analysis::prompts::{COMPATIBILITY_PROMPT_TEMPLATE, COMPATIBILITY_SYSTEM};
use crate::analysis::require_text;
use crate::errors::AppError;
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::llm_client::LlmClient;

/// Whether a key job-description keyword shows up in the résumé.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordPresence {
    pub keyword: String,
    #[serde(alias = "present_in_resume")]
    pub present: bool,
}

/// Structured output of Stage A, consumed by value by Stages B and C.
/// Every field is required: a partial object is a parse failure, not an empty analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityAnalysis {
    /// 0 – 100
    #[serde(alias = "compatibility_score", deserialize_with = "deserialize_score")]
    pub score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub keyword_analysis: Vec<KeywordPresence>,
    pub summary: String,
}

/// Request shape for Stage A; field names match the capability's argument schema.
#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilityRequest {
    pub resume_text: String,
    pub job_description_text: String,
}

/// Accepts integer or float scores (models emit both) and enforces the 0–100 range.
fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(D::Error::custom(format!(
            "score {value} is outside the range 0-100"
        )));
    }
    Ok(value.round() as u8)
}

/// Runs Stage A.
///
/// Empty inputs are rejected before the model is called. A response that cannot be
/// parsed comes back as `AppError::AnalysisParse` with the raw text, never as a
/// partially filled analysis.
pub async fn analyze_compatibility(
    llm: &LlmClient,
    request: &CompatibilityRequest,
) -> Result<CompatibilityAnalysis, AppError> {
    require_text("resume_text", &request.resume_text)?;
    require_text("job_description_text", &request.job_description_text)?;

    info!(
        "Analyzing compatibility: resume={} chars, jd={} chars",
        request.resume_text.len(),
        request.job_description_text.len()
    );

    let prompt = build_compatibility_prompt(request);
    let analysis: CompatibilityAnalysis = llm.call_json(&prompt, COMPATIBILITY_SYSTEM).await?;

    info!(
        "Compatibility score {}/100 ({} strengths, {} weaknesses)",
        analysis.score,
        analysis.strengths.len(),
        analysis.weaknesses.len()
    );
    Ok(analysis)
}

fn build_compatibility_prompt(request: &CompatibilityRequest) -> String {
    COMPATIBILITY_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{resume_text}", request.resume_text.trim())
        .replace("{jd_text}", request.job_description_text.trim())
}
