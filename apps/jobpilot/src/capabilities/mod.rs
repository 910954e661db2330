// Capabilities: the closed set of callables the planner may invoke by name.
// The registry maps names to descriptors; the Toolbox turns a resolved descriptor plus
// JSON arguments into a typed call. Nothing is looked up by reflection.

pub mod files;
pub mod registry;
pub mod scraper;
pub mod workspace;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::compatibility::{analyze_compatibility, CompatibilityRequest};
use crate::analysis::cover_letter::{draft_cover_letter, CoverLetterRequest};
use crate::analysis::resume_tuner::{suggest_resume_improvements, ResumeTuningRequest};
use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::LlmClient;

use self::registry::{CapabilityDescriptor, CapabilityRegistry, ParamSpec, ParamType, RegistryError};
use self::scraper::{JobBoardScraper, ScrapeError};
use self::workspace::{LogError, WorkspaceClient};

/// One variant per callable. Descriptors carry one of these as their invocation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    LoadText,
    LoadResume,
    WriteFile,
    ScrapeJobBoard,
    AppendToWorkspace,
    AnalyzeCompatibility,
    DraftCoverLetter,
    SuggestResumeImprovements,
}

/// Failures at the external boundaries (files, web, workspace) and at dispatch.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not extract text from PDF {}: {reason}", .path.display())]
    Pdf { path: PathBuf, reason: String },

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error("invalid arguments for '{capability}': {reason}")]
    InvalidArguments { capability: String, reason: String },

    #[error("capability '{capability}' timed out after {after:?}")]
    Timeout { capability: String, after: Duration },

    #[error("capability '{0}' is not configured")]
    Unavailable(String),
}

impl CapabilityError {
    pub fn code(&self) -> &'static str {
        match self {
            CapabilityError::NotFound { .. } => "NOT_FOUND",
            CapabilityError::Read { .. } => "READ_ERROR",
            CapabilityError::Write { .. } => "WRITE_ERROR",
            CapabilityError::Pdf { .. } => "PDF_EXTRACTION_ERROR",
            CapabilityError::Scrape(ScrapeError::UnsupportedScheme(_)) => "UNSUPPORTED_SCHEME",
            CapabilityError::Scrape(_) => "SCRAPE_ERROR",
            CapabilityError::Log(LogError::EmptyContent) => "EMPTY_CONTENT",
            CapabilityError::Log(_) => "LOG_ERROR",
            CapabilityError::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            CapabilityError::Timeout { .. } => "CAPABILITY_TIMEOUT",
            CapabilityError::Unavailable(_) => "CAPABILITY_UNAVAILABLE",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Argument shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FilePathArgs {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    file_path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ScrapeArgs {
    url: String,
    #[serde(default)]
    job_title_keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AppendArgs {
    page_id: String,
    text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Registry construction
// ────────────────────────────────────────────────────────────────────────────

/// Builds the registry of every built-in capability.
///
/// Defaults that come from configuration (résumé path, candidate name, logging page)
/// are baked into the parameter schema here. Workspace logging is only registered
/// when workspace credentials are configured.
pub fn builtin_registry(config: &Config) -> Result<CapabilityRegistry, RegistryError> {
    use ParamType::{Object, String as Text, StringList};

    let mut registry = CapabilityRegistry::new();

    registry.register(
        CapabilityDescriptor::new(
            "load_text_file",
            "Load the text content of a local file, such as a job description.",
            Capability::LoadText,
        )
        .param(ParamSpec::required("file_path", Text, "Absolute path, or relative to the working directory.")),
    )?;

    registry.register(
        CapabilityDescriptor::new(
            "load_resume_text",
            "Load the candidate's résumé as text. PDF résumés are text-extracted.",
            Capability::LoadResume,
        )
        .param(
            ParamSpec::optional("file_path", Text, "Path to the résumé (.txt or .pdf).")
                .with_default(Some(json!(config.resume_path.display().to_string()))),
        ),
    )?;

    registry.register(
        CapabilityDescriptor::new(
            "write_file",
            "Write text to a local file, creating intermediate directories as needed.",
            Capability::WriteFile,
        )
        .param(ParamSpec::required("file_path", Text, "Destination path."))
        .param(ParamSpec::required("content", Text, "Text to write.")),
    )?;

    registry.register(
        CapabilityDescriptor::new(
            "scrape_job_board",
            "Scrape job postings (title, company, url, description) from an http(s) or file:// URL.",
            Capability::ScrapeJobBoard,
        )
        .param(ParamSpec::required("url", Text, "Job board URL."))
        .param(ParamSpec::optional(
            "job_title_keywords",
            StringList,
            "Keep only postings whose title contains any of these (case-insensitive).",
        )),
    )?;

    if let Some(workspace) = &config.workspace {
        let page_id = ParamSpec::optional("page_id", Text, "Notion page that receives the entry.");
        let page_id = match &workspace.default_page_id {
            Some(id) => page_id.with_default(Some(json!(id))),
            None => ParamSpec { required: true, ..page_id },
        };
        registry.register(
            CapabilityDescriptor::new(
                "append_text_to_workspace_page",
                "Append notes to the application-tracking workspace page. Each non-blank line becomes one entry.",
                Capability::AppendToWorkspace,
            )
            .param(page_id)
            .param(ParamSpec::required("text", Text, "Text to log.")),
        )?;
    }

    registry.register(
        CapabilityDescriptor::new(
            "analyze_resume_jd_match",
            "Score how well a résumé matches a job description. Returns score, strengths, weaknesses, keyword_analysis and summary.",
            Capability::AnalyzeCompatibility,
        )
        .param(ParamSpec::required("resume_text", Text, "Full résumé text."))
        .param(ParamSpec::required("job_description_text", Text, "Full job description text.")),
    )?;

    registry.register(
        CapabilityDescriptor::new(
            "draft_cover_letter",
            "Draft a tailored cover letter. Pass the result of analyze_resume_jd_match as compatibility_analysis when available.",
            Capability::DraftCoverLetter,
        )
        .param(ParamSpec::required("resume_text", Text, "Full résumé text."))
        .param(ParamSpec::required("job_description_text", Text, "Full job description text."))
        .param(ParamSpec::required("company_name", Text, "Hiring company."))
        .param(ParamSpec::required("job_title", Text, "Position title."))
        .param(
            ParamSpec::optional("candidate_name", Text, "Name to sign the letter with.")
                .with_default(Some(json!(config.candidate_name))),
        )
        .param(ParamSpec::optional("compatibility_analysis", Object, "Output of analyze_resume_jd_match.")),
    )?;

    registry.register(
        CapabilityDescriptor::new(
            "suggest_resume_improvements",
            "Suggest concrete résumé edits for a job description. Pass the result of analyze_resume_jd_match when available.",
            Capability::SuggestResumeImprovements,
        )
        .param(ParamSpec::required("resume_text", Text, "Full résumé text."))
        .param(ParamSpec::required("job_description_text", Text, "Full job description text."))
        .param(ParamSpec::optional("compatibility_analysis", Object, "Output of analyze_resume_jd_match.")),
    )?;

    info!("Registered {} capabilities", registry.len());
    Ok(registry)
}

// ────────────────────────────────────────────────────────────────────────────
// Dispatch
// ────────────────────────────────────────────────────────────────────────────

/// Collaborators the capabilities need. Shared read-only across tasks.
pub struct Toolbox {
    llm: LlmClient,
    scraper: JobBoardScraper,
    workspace: Option<Arc<dyn WorkspaceClient>>,
}

impl Toolbox {
    pub fn new(
        llm: LlmClient,
        scraper: JobBoardScraper,
        workspace: Option<Arc<dyn WorkspaceClient>>,
    ) -> Self {
        Self {
            llm,
            scraper,
            workspace,
        }
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    /// Validates `args` against the descriptor's schema and runs the capability.
    pub async fn invoke(
        &self,
        descriptor: &CapabilityDescriptor,
        args: Value,
    ) -> Result<Value, AppError> {
        let args = descriptor.prepare_arguments(args)?;
        let started = Instant::now();

        let result = self.dispatch(descriptor, args).await;
        match &result {
            Ok(_) => info!(
                "Capability {} succeeded in {}ms",
                descriptor.name,
                started.elapsed().as_millis()
            ),
            Err(e) => warn!(
                "Capability {} failed in {}ms: {e}",
                descriptor.name,
                started.elapsed().as_millis()
            ),
        }
        result
    }

    async fn dispatch(&self, descriptor: &CapabilityDescriptor, args: Value) -> Result<Value, AppError> {
        let name = descriptor.name.as_str();
        match descriptor.capability {
            Capability::LoadText => {
                let args: FilePathArgs = parse_args(name, args)?;
                Ok(Value::String(files::load_text(&args.file_path).await?))
            }
            Capability::LoadResume => {
                let args: FilePathArgs = parse_args(name, args)?;
                Ok(Value::String(files::load_resume(&args.file_path).await?))
            }
            Capability::WriteFile => {
                let args: WriteFileArgs = parse_args(name, args)?;
                let written = files::write_file(&args.file_path, &args.content).await?;
                Ok(json!({ "written_to": written.display().to_string() }))
            }
            Capability::ScrapeJobBoard => {
                let args: ScrapeArgs = parse_args(name, args)?;
                let postings = self
                    .scraper
                    .scrape(&args.url, &args.job_title_keywords)
                    .await
                    .map_err(CapabilityError::from)?;
                to_json(&postings)
            }
            Capability::AppendToWorkspace => {
                let args: AppendArgs = parse_args(name, args)?;
                let client = self
                    .workspace
                    .as_deref()
                    .ok_or_else(|| CapabilityError::Unavailable(name.to_string()))?;
                let logged = workspace::append_text(client, &args.page_id, &args.text)
                    .await
                    .map_err(CapabilityError::from)?;
                Ok(json!({ "logged_units": logged }))
            }
            Capability::AnalyzeCompatibility => {
                let request: CompatibilityRequest = parse_args(name, args)?;
                to_json(&analyze_compatibility(&self.llm, &request).await?)
            }
            Capability::DraftCoverLetter => {
                let request: CoverLetterRequest = parse_args(name, args)?;
                to_json(&draft_cover_letter(&self.llm, &request).await?)
            }
            Capability::SuggestResumeImprovements => {
                let request: ResumeTuningRequest = parse_args(name, args)?;
                Ok(Value::String(
                    suggest_resume_improvements(&self.llm, &request).await?,
                ))
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(capability: &str, args: Value) -> Result<T, CapabilityError> {
    serde_json::from_value(args).map_err(|e| CapabilityError::InvalidArguments {
        capability: capability.to_string(),
        reason: e.to_string(),
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    Ok(serde_json::to_value(value).map_err(anyhow::Error::from)?)
}

#[cfg(test)]
mod tests {
    use super::workspace::testing::RecordingWorkspace;
    use super::*;
    use crate::config::{test_config, WorkspaceConfig};
    use crate::llm_client::testing::{client, ScriptedCompletion};

    fn toolbox(
        scripted: Arc<ScriptedCompletion>,
        workspace: Option<Arc<dyn WorkspaceClient>>,
    ) -> Toolbox {
        Toolbox::new(client(scripted), JobBoardScraper::new().unwrap(), workspace)
    }

    fn workspace_config(page: Option<&str>) -> Config {
        Config {
            workspace: Some(WorkspaceConfig {
                api_key: "secret".to_string(),
                default_page_id: page.map(str::to_string),
            }),
            ..test_config()
        }
    }

    #[test]
    fn test_builtin_registry_without_workspace() {
        let registry = builtin_registry(&test_config()).unwrap();
        assert_eq!(registry.len(), 7);
        assert!(matches!(
            registry.resolve("append_text_to_workspace_page"),
            Err(RegistryError::UnknownCapability(_))
        ));
        assert_eq!(
            registry.resolve("scrape-job-board").unwrap().capability,
            Capability::ScrapeJobBoard
        );
    }

    #[test]
    fn test_builtin_registry_with_workspace_uses_default_page() {
        let registry = builtin_registry(&workspace_config(Some("page-42"))).unwrap();
        assert_eq!(registry.len(), 8);
        let append = registry.resolve("append_text_to_workspace_page").unwrap();
        let prepared = append.prepare_arguments(json!({"text": "hi"})).unwrap();
        assert_eq!(prepared["page_id"], "page-42");
    }

    #[test]
    fn test_workspace_page_required_without_default() {
        let registry = builtin_registry(&workspace_config(None)).unwrap();
        let append = registry.resolve("append_text_to_workspace_page").unwrap();
        let err = append.prepare_arguments(json!({"text": "hi"})).unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments { .. }));
    }

    #[test]
    fn test_capability_error_codes() {
        assert_eq!(
            CapabilityError::Scrape(ScrapeError::UnsupportedScheme("ftp".into())).code(),
            "UNSUPPORTED_SCHEME"
        );
        assert_eq!(CapabilityError::Log(LogError::EmptyContent).code(), "EMPTY_CONTENT");
        assert_eq!(
            CapabilityError::NotFound { path: "x".into() }.code(),
            "NOT_FOUND"
        );
    }

    #[tokio::test]
    async fn test_invoke_load_and_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = builtin_registry(&test_config()).unwrap();
        let tools = toolbox(Arc::new(ScriptedCompletion::default()), None);

        let out_path = dir.path().join("letters/acme.txt");
        let written = tools
            .invoke(
                registry.resolve("write_file").unwrap(),
                json!({"file_path": out_path.to_str().unwrap(), "content": "Dear Acme,"}),
            )
            .await
            .unwrap();
        assert_eq!(written["written_to"], out_path.display().to_string());

        let loaded = tools
            .invoke(
                registry.resolve("load_text_file").unwrap(),
                json!({"file_path": out_path.to_str().unwrap()}),
            )
            .await
            .unwrap();
        assert_eq!(loaded, "Dear Acme,");
    }

    #[tokio::test]
    async fn test_invoke_missing_required_argument_skips_model() {
        let scripted = Arc::new(ScriptedCompletion::default());
        let registry = builtin_registry(&test_config()).unwrap();
        let tools = toolbox(scripted.clone(), None);

        let err = tools
            .invoke(
                registry.resolve("analyze_resume_jd_match").unwrap(),
                json!({"resume_text": "Python"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENTS");
        assert_eq!(scripted.calls(), 0);
    }

    #[tokio::test]
    async fn test_invoke_compatibility_returns_structured_analysis() {
        let scripted = Arc::new(ScriptedCompletion::new([
            r#"```json
{"score": 72, "strengths": ["Python"], "weaknesses": [], "keyword_analysis": [], "summary": "Good"}
```"#,
        ]));
        let registry = builtin_registry(&test_config()).unwrap();
        let tools = toolbox(scripted.clone(), None);

        let out = tools
            .invoke(
                registry.resolve("analyze_resume_jd_match").unwrap(),
                json!({"resume_text": "Python dev", "job_description_text": "Python role"}),
            )
            .await
            .unwrap();
        assert_eq!(out["score"], 72);
        assert_eq!(out["strengths"][0], "Python");
        assert_eq!(scripted.calls(), 1);
    }

    #[tokio::test]
    async fn test_invoke_cover_letter_uses_configured_candidate_name() {
        let scripted = Arc::new(ScriptedCompletion::new(["Dear hiring manager, ..."]));
        let config = Config {
            candidate_name: "Jane Doe".to_string(),
            ..test_config()
        };
        let registry = builtin_registry(&config).unwrap();
        let tools = toolbox(scripted.clone(), None);

        let out = tools
            .invoke(
                registry.resolve("draft_cover_letter").unwrap(),
                json!({
                    "resume_text": "Python dev",
                    "job_description_text": "Python role",
                    "company_name": "Acme",
                    "job_title": "Engineer",
                }),
            )
            .await
            .unwrap();
        assert_eq!(out["needs_review"], false);
        assert!(scripted.prompts()[0].contains("written by Jane Doe"));
    }

    #[tokio::test]
    async fn test_invoke_append_to_workspace() {
        let recorder = Arc::new(RecordingWorkspace::default());
        let registry = builtin_registry(&workspace_config(Some("page-1"))).unwrap();
        let tools = toolbox(Arc::new(ScriptedCompletion::default()), Some(recorder.clone()));

        let out = tools
            .invoke(
                registry.resolve("append_text_to_workspace_page").unwrap(),
                json!({"text": "Applied to Acme\nStatus: sent"}),
            )
            .await
            .unwrap();
        assert_eq!(out["logged_units"], 2);
        assert_eq!(recorder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invoke_append_without_client_is_unavailable() {
        let registry = builtin_registry(&workspace_config(Some("page-1"))).unwrap();
        let tools = toolbox(Arc::new(ScriptedCompletion::default()), None);

        let err = tools
            .invoke(
                registry.resolve("append_text_to_workspace_page").unwrap(),
                json!({"text": "x"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CAPABILITY_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_invoke_scrape_unsupported_scheme() {
        let registry = builtin_registry(&test_config()).unwrap();
        let tools = toolbox(Arc::new(ScriptedCompletion::default()), None);

        let err = tools
            .invoke(
                registry.resolve("scrape_job_board").unwrap(),
                json!({"url": "ftp://jobs.example.com"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_SCHEME");
        assert_eq!(err.to_observation()["error"]["code"], "UNSUPPORTED_SCHEME");
    }
}
