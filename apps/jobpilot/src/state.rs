use crate::capabilities::registry::CapabilityRegistry;
use crate::capabilities::Toolbox;
use crate::config::Config;
use crate::llm_client::LlmClient;

/// Shared application state built once in `main` and handed to the Task Controller.
/// Read-only after construction; every task session sees the same registry.
pub struct AppState {
    pub config: Config,
    pub registry: CapabilityRegistry,
    /// Collaborators behind the registered capabilities, including the LLM client.
    pub toolbox: Toolbox,
}

impl AppState {
    pub fn llm(&self) -> &LlmClient {
        self.toolbox.llm()
    }
}
