/// LLM Client: the single point of entry for all completion calls in jobpilot.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Stages and the controller hold an `LlmClient`; the HTTP transport sits behind
/// the `CompletionService` trait so tests can script model output.
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;

pub mod normalize;
pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited after {retries} attempts")]
    RateLimit { retries: u32 },

    #[error("network error: {0}")]
    Network(String),

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Unknown(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Authentication(_) => "AUTHENTICATION_ERROR",
            ServiceError::RateLimit { .. } => "RATE_LIMIT_ERROR",
            ServiceError::Network(_) => "NETWORK_ERROR",
            ServiceError::Timeout(_) => "TIMEOUT_ERROR",
            ServiceError::Unknown(_) => "UNKNOWN_SERVICE_ERROR",
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ServiceError::Unknown(format!("malformed API response: {e}"))
        } else {
            ServiceError::Network(e.to_string())
        }
    }
}

/// One completion request. Each stage builds its own; nothing is shared between calls.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub prompt: &'a str,
}

/// The opaque request/response boundary to the language model.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ServiceError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages API transport
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// HTTP implementation of `CompletionService` over the Anthropic Messages API.
/// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
#[derive(Clone)]
pub struct AnthropicService {
    client: Client,
    api_key: String,
}

impl AnthropicService {
    pub fn new(api_key: String) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ServiceError::Unknown(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl CompletionService for AnthropicService {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ServiceError> {
        let request_body = AnthropicRequest {
            model: request.model,
            max_tokens: MAX_TOKENS,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let mut last_error: Option<ServiceError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Completion attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ServiceError::from(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                warn!("Completion API rate limited (attempt {})", attempt + 1);
                last_error = Some(ServiceError::RateLimit {
                    retries: attempt + 1,
                });
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Completion API returned {}: {}", status, body);
                last_error = Some(ServiceError::Unknown(format!(
                    "API error (status {}): {}",
                    status.as_u16(),
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(match status.as_u16() {
                    401 | 403 => ServiceError::Authentication(message),
                    code => ServiceError::Unknown(format!("API error (status {code}): {message}")),
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "Completion succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            // A response with no text block is an empty completion, not a failure.
            return Ok(llm_response.text().unwrap_or_default().to_string());
        }

        Err(last_error.unwrap_or(ServiceError::RateLimit {
            retries: MAX_RETRIES,
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmClient: what stages and the controller actually hold
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client used by all stages and the controller.
/// Binds a transport to a model id and a caller-side timeout.
#[derive(Clone)]
pub struct LlmClient {
    service: Arc<dyn CompletionService>,
    model: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(service: Arc<dyn CompletionService>, model: String, timeout: Duration) -> Self {
        Self {
            service,
            model,
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes one completion call, bounded by the configured timeout.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<String, ServiceError> {
        let request = CompletionRequest {
            model: &self.model,
            system,
            prompt,
        };
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.service.complete(&request))
            .await
            .map_err(|_| ServiceError::Timeout(self.timeout))?;

        match &result {
            Ok(text) => debug!(
                "Completion returned {} chars in {}ms",
                text.len(),
                started.elapsed().as_millis()
            ),
            Err(e) => warn!("Completion failed after {}ms: {e}", started.elapsed().as_millis()),
        }
        result
    }

    /// Calls the LLM and parses the text response as JSON through the output normalizer.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, AppError> {
        let text = self.call(prompt, system).await?;
        Ok(normalize::normalize::<T>(&text)?)
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays queued responses in order and records every prompt it receives.
    #[derive(Default)]
    pub struct ScriptedCompletion {
        responses: Mutex<VecDeque<Result<String, ServiceError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        pub fn new<I, S>(responses: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn push_error(&self, error: ServiceError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        pub fn push(&self, response: impl Into<String>) {
            self.responses.lock().unwrap().push_back(Ok(response.into()));
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ServiceError> {
            self.prompts.lock().unwrap().push(request.prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::Unknown("script exhausted".to_string())))
        }
    }

    /// Never answers; used to exercise the caller-side timeout.
    pub struct HangingCompletion;

    #[async_trait]
    impl CompletionService for HangingCompletion {
        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String, ServiceError> {
            std::future::pending().await
        }
    }

    pub fn client(service: Arc<dyn CompletionService>) -> LlmClient {
        LlmClient::new(service, "test-model".to_string(), Duration::from_secs(5))
    }
}
