use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_CANDIDATE_NAME: &str = "the candidate";
const DEFAULT_RESUME_PATH: &str = "data/resume.txt";

/// Credentials for the external workspace (Notion) used for application logging.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub api_key: String,
    /// Page that receives log entries when the planner does not name one.
    pub default_page_id: Option<String>,
}

/// Application configuration loaded from environment variables.
/// Validated once at startup and passed explicitly to everything that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub model: String,
    pub workspace: Option<WorkspaceConfig>,
    pub candidate_name: String,
    pub resume_path: PathBuf,
    pub max_iterations: u32,
    pub max_consecutive_errors: u32,
    pub llm_timeout: Duration,
    pub capability_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let workspace = get("NOTION_API_KEY").map(|api_key| WorkspaceConfig {
            api_key,
            default_page_id: get("NOTION_PAGE_ID_FOR_LOGGING"),
        });

        Ok(Config {
            anthropic_api_key: get("ANTHROPIC_API_KEY").ok_or_else(|| {
                AppError::Configuration(
                    "Required environment variable 'ANTHROPIC_API_KEY' is not set".to_string(),
                )
            })?,
            model: get("JOBPILOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            workspace,
            candidate_name: get("JOBPILOT_CANDIDATE_NAME")
                .unwrap_or_else(|| DEFAULT_CANDIDATE_NAME.to_string()),
            resume_path: get("JOBPILOT_RESUME_PATH")
                .unwrap_or_else(|| DEFAULT_RESUME_PATH.to_string())
                .into(),
            max_iterations: parse_cap(get("JOBPILOT_MAX_ITERATIONS"), "JOBPILOT_MAX_ITERATIONS", 12)?,
            max_consecutive_errors: parse_cap(
                get("JOBPILOT_MAX_CONSECUTIVE_ERRORS"),
                "JOBPILOT_MAX_CONSECUTIVE_ERRORS",
                3,
            )?,
            llm_timeout: Duration::from_secs(parse_cap(
                get("JOBPILOT_LLM_TIMEOUT_SECS"),
                "JOBPILOT_LLM_TIMEOUT_SECS",
                120,
            )? as u64),
            capability_timeout: Duration::from_secs(parse_cap(
                get("JOBPILOT_CAPABILITY_TIMEOUT_SECS"),
                "JOBPILOT_CAPABILITY_TIMEOUT_SECS",
                180,
            )? as u64),
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Parses a positive integer setting, falling back to `default` when unset.
fn parse_cap(raw: Option<String>, key: &str, default: u32) -> Result<u32, AppError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(AppError::Configuration(format!(
            "'{key}' must be a positive integer, got '{raw}'"
        ))),
        Ok(n) => Ok(n),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        anthropic_api_key: "test-key".to_string(),
        model: DEFAULT_MODEL.to_string(),
        workspace: None,
        candidate_name: DEFAULT_CANDIDATE_NAME.to_string(),
        resume_path: DEFAULT_RESUME_PATH.into(),
        max_iterations: 6,
        max_consecutive_errors: 3,
        llm_timeout: Duration::from_secs(5),
        capability_timeout: Duration::from_secs(5),
        rust_log: "debug".to_string(),
    }
}
