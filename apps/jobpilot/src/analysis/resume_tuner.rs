//! Stage C: résumé tuning suggestions.

use serde::Deserialize;
use tracing::{info, warn};

use crate::analysis::prompts::{
    ANALYSIS_UNAVAILABLE, RESUME_TUNER_PROMPT_TEMPLATE, RESUME_TUNER_SYSTEM,
};
use crate::analysis::{lenient_analysis, require_text, CompatibilityAnalysis};
use crate::errors::AppError;
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::llm_client::LlmClient;

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeTuningRequest {
    pub resume_text: String,
    pub job_description_text: String,
    #[serde(default, deserialize_with = "lenient_analysis")]
    pub compatibility_analysis: Option<CompatibilityAnalysis>,
}

/// Runs Stage C. A missing analysis is not fatal: the prompt says so and the model
/// works from the résumé and job description alone.
pub async fn suggest_resume_improvements(
    llm: &LlmClient,
    request: &ResumeTuningRequest,
) -> Result<String, AppError> {
    require_text("resume_text", &request.resume_text)?;
    require_text("job_description_text", &request.job_description_text)?;

    if request.compatibility_analysis.is_none() {
        warn!("Résumé tuning without compatibility analysis; suggestions will be less targeted");
    }

    let prompt = build_resume_tuner_prompt(request);
    let suggestions = llm.call(&prompt, RESUME_TUNER_SYSTEM).await?;
    let suggestions = suggestions.trim().to_string();

    info!("Generated résumé suggestions ({} chars)", suggestions.len());
    Ok(suggestions)
}

fn build_analysis_section(analysis: Option<&CompatibilityAnalysis>) -> String {
    let Some(analysis) = analysis else {
        return ANALYSIS_UNAVAILABLE.to_string();
    };

    let mut lines = vec![format!("Overall compatibility score: {}%", analysis.score)];
    if !analysis.strengths.is_empty() {
        lines.push("Strengths to leverage:".to_string());
        lines.extend(analysis.strengths.iter().map(|s| format!("- {s}")));
    }
    if !analysis.weaknesses.is_empty() {
        lines.push("Weaknesses and gaps to address:".to_string());
        lines.extend(analysis.weaknesses.iter().map(|w| format!("- {w}")));
    }
    if !analysis.keyword_analysis.is_empty() {
        lines.push("Key job-description keywords:".to_string());
        lines.extend(analysis.keyword_analysis.iter().map(|k| {
            format!(
                "- '{}': {}",
                k.keyword,
                if k.present { "present in résumé" } else { "missing from résumé" }
            )
        }));
    }
    if !analysis.summary.trim().is_empty() {
        lines.push(format!("Summary: {}", analysis.summary.trim()));
    }
    lines.join("\n")
}

fn build_resume_tuner_prompt(request: &ResumeTuningRequest) -> String {
    RESUME_TUNER_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{resume_text}", request.resume_text.trim())
        .replace("{jd_text}", request.job_description_text.trim())
        .replace(
            "{analysis_section}",
            &build_analysis_section(request.compatibility_analysis.as_ref()),
        )
}
