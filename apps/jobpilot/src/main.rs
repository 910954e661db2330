mod analysis;
mod capabilities;
mod config;
mod controller;
mod errors;
mod llm_client;
mod repl;
mod state;

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::capabilities::scraper::JobBoardScraper;
use crate::capabilities::workspace::{NotionClient, WorkspaceClient};
use crate::capabilities::{builtin_registry, Toolbox};
use crate::config::Config;
use crate::controller::TaskController;
use crate::llm_client::{AnthropicService, LlmClient};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Missing credentials are reported here, before any task is attempted
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    // Logs go to stderr; stdout carries task results
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting jobpilot v{}", env!("CARGO_PKG_VERSION"));

    let service = AnthropicService::new(config.anthropic_api_key.clone())?;
    let llm = LlmClient::new(Arc::new(service), config.model.clone(), config.llm_timeout);
    info!("LLM client initialized (model: {})", llm.model());

    let workspace: Option<Arc<dyn WorkspaceClient>> = match &config.workspace {
        Some(ws) => {
            info!("Workspace logging enabled");
            Some(Arc::new(NotionClient::new(ws.api_key.clone())?))
        }
        None => None,
    };

    let registry = builtin_registry(&config)?;
    let toolbox = Toolbox::new(llm, JobBoardScraper::new()?, workspace);

    let state = Arc::new(AppState {
        config,
        registry,
        toolbox,
    });
    let controller = TaskController::new(state.clone());

    let mut stdout = std::io::stdout();
    println!("{}", repl::banner(&state));
    repl::run(&controller, BufReader::new(tokio::io::stdin()), &mut stdout).await?;
    stdout.flush()?;

    // a stdin read still parked on the blocking pool would hold runtime shutdown open
    std::process::exit(0);
}
