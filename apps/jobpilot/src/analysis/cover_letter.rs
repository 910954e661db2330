//! Stage B: cover letter drafting.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::prompts::{
    COVER_LETTER_INSIGHTS_HEADER, COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM,
};
use crate::analysis::{lenient_analysis, require_text, CompatibilityAnalysis};
use crate::config::DEFAULT_CANDIDATE_NAME;
use crate::errors::AppError;
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::llm_client::LlmClient;

/// Caps on how much of the analysis is surfaced into the prompt.
pub const MAX_SURFACED_STRENGTHS: usize = 3;
pub const MAX_SURFACED_WEAKNESSES: usize = 2;

/// Lead-ins models like to put before the letter. Matched case-insensitively;
/// everything up to and including the first colon is dropped.
const BOILERPLATE_PREFIXES: &[&str] = &[
    "here is the cover letter:",
    "here's the cover letter:",
    "here is a draft of the cover letter:",
    "here's a draft of the cover letter:",
    "here is your cover letter:",
    "here's your cover letter:",
];

#[derive(Debug, Clone, Deserialize)]
pub struct CoverLetterRequest {
    pub resume_text: String,
    pub job_description_text: String,
    pub company_name: String,
    pub job_title: String,
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_analysis")]
    pub compatibility_analysis: Option<CompatibilityAnalysis>,
}

/// Output of Stage B. An empty letter is a valid result that needs a human look.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverLetterDraft {
    pub text: String,
    pub needs_review: bool,
}

impl CoverLetterDraft {
    fn new(text: String) -> Self {
        let needs_review = text.trim().is_empty();
        Self { text, needs_review }
    }
}

pub async fn draft_cover_letter(
    llm: &LlmClient,
    request: &CoverLetterRequest,
) -> Result<CoverLetterDraft, AppError> {
    require_text("resume_text", &request.resume_text)?;
    require_text("job_description_text", &request.job_description_text)?;
    require_text("company_name", &request.company_name)?;
    require_text("job_title", &request.job_title)?;

    info!(
        "Drafting cover letter for '{}' at '{}' (analysis: {})",
        request.job_title,
        request.company_name,
        request.compatibility_analysis.is_some()
    );

    let prompt = build_cover_letter_prompt(request);
    let response = llm.call(&prompt, COVER_LETTER_SYSTEM).await?;
    let draft = CoverLetterDraft::new(strip_boilerplate(&response));

    if draft.needs_review {
        warn!("Cover letter draft came back empty; flagging for review");
    } else {
        info!("Cover letter drafted ({} chars)", draft.text.len());
    }
    Ok(draft)
}

/// The strengths and weaknesses that make it into the prompt, highest signal first.
pub fn surfaced_insights(analysis: &CompatibilityAnalysis) -> (&[String], &[String]) {
    let strengths = &analysis.strengths[..analysis.strengths.len().min(MAX_SURFACED_STRENGTHS)];
    let weaknesses =
        &analysis.weaknesses[..analysis.weaknesses.len().min(MAX_SURFACED_WEAKNESSES)];
    (strengths, weaknesses)
}

fn build_insights_section(analysis: Option<&CompatibilityAnalysis>) -> String {
    let Some(analysis) = analysis else {
        return String::new();
    };

    let (strengths, weaknesses) = surfaced_insights(analysis);
    let mut lines = vec![String::new(), COVER_LETTER_INSIGHTS_HEADER.to_string()];

    if !strengths.is_empty() {
        lines.push("Key strengths to emphasize:".to_string());
        lines.extend(strengths.iter().map(|s| format!("- {s}")));
    }
    if !weaknesses.is_empty() {
        lines.push("Potential gaps to address or reframe (subtly):".to_string());
        lines.extend(weaknesses.iter().map(|w| format!("- {w}")));
    }
    if !analysis.summary.trim().is_empty() {
        lines.push(format!("Overall fit summary: {}", analysis.summary.trim()));
    }
    lines.push(String::new());
    lines.join("\n")
}

pub fn build_cover_letter_prompt(request: &CoverLetterRequest) -> String {
    let candidate_name = request
        .candidate_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_CANDIDATE_NAME);

    COVER_LETTER_PROMPT_TEMPLATE
        .replace("{candidate_name}", candidate_name)
        .replace("{job_title}", request.job_title.trim())
        .replace("{company_name}", request.company_name.trim())
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{resume_text}", request.resume_text.trim())
        .replace("{jd_text}", request.job_description_text.trim())
        .replace(
            "{insights}",
            &build_insights_section(request.compatibility_analysis.as_ref()),
        )
}

/// Removes "here is the cover letter:"-style lead-ins from the model response.
pub fn strip_boilerplate(response: &str) -> String {
    let mut text = response.trim();
    loop {
        let lower = text.to_lowercase();
        let has_prefix = BOILERPLATE_PREFIXES.iter().any(|p| lower.starts_with(p));
        match text.split_once(':') {
            Some((_, rest)) if has_prefix => text = rest.trim(),
            _ => break,
        }
    }
    text.to_string()
}
