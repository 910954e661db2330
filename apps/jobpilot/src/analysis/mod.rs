// Analysis pipeline: compatibility analysis → cover letter drafting → résumé tuning.
// Each stage builds its own completion request and returns a typed error instead of
// raising past this module. All LLM calls go through llm_client.

pub mod compatibility;
pub mod cover_letter;
pub mod prompts;
pub mod resume_tuner;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::errors::AppError;

pub use compatibility::CompatibilityAnalysis;

/// Rejects empty or whitespace-only stage input before any model call is made.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Accepts a compatibility analysis argument that may be missing or malformed.
///
/// Stages B and C treat the analysis as optional context, so an unusable payload
/// (for example an error object from a failed Stage A) degrades to `None`.
pub(crate) fn lenient_analysis<'de, D>(
    deserializer: D,
) -> Result<Option<CompatibilityAnalysis>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match serde_json::from_value::<CompatibilityAnalysis>(v) {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            warn!("Ignoring malformed compatibility analysis argument: {e}");
            None
        }
    }))
}
