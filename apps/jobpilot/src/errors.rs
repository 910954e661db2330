use serde_json::{json, Value};
use thiserror::Error;

use crate::capabilities::registry::RegistryError;
use crate::capabilities::CapabilityError;
use crate::llm_client::normalize::AnalysisParseError;
use crate::llm_client::ServiceError;

/// Application-level error type.
/// Every failure that can reach the controller or the REPL is one of these.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Completion service error: {0}")]
    Service(#[from] ServiceError),

    #[error(transparent)]
    AnalysisParse(#[from] AnalysisParseError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, used when the error is shown to the planner.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Service(e) => e.code(),
            AppError::AnalysisParse(_) => "ANALYSIS_PARSE_ERROR",
            AppError::Capability(e) => e.code(),
            AppError::Registry(RegistryError::DuplicateCapability { .. }) => "DUPLICATE_CAPABILITY",
            AppError::Registry(RegistryError::UnknownCapability(_)) => "UNKNOWN_CAPABILITY",
            AppError::Registry(RegistryError::InvalidName(_)) => "INVALID_CAPABILITY_NAME",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors that end the task instead of being fed back to planning.
    pub fn is_unrecoverable(&self) -> bool {
        match self {
            AppError::Configuration(_) => true,
            AppError::Service(e) => matches!(e, ServiceError::Authentication(_) | ServiceError::Timeout(_)),
            AppError::Capability(CapabilityError::Timeout { .. }) => true,
            _ => false,
        }
    }

    /// JSON observation appended to the transcript for this error.
    /// Parse errors keep the raw model text so a follow-up step can correct it.
    pub fn to_observation(&self) -> Value {
        let mut body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        if let AppError::AnalysisParse(e) = self {
            body["error"]["raw_output"] = Value::String(e.raw.clone());
        }
        body
    }
}
