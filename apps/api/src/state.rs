use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Single entry point for inference calls; holds one provider per kind.
    pub llm: LlmClient,
    /// Per-user session context: resume text, chat history, preferences.
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, llm: LlmClient) -> Self {
        let sessions = SessionStore::new(config.session_ttl);
        Self {
            config,
            llm,
            sessions,
        }
    }
}
