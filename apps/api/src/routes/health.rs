use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and the default inference provider.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let provider = state.llm.default_kind();
    let active_sessions = state.sessions.len().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-copilot",
        "provider": provider,
        "model": state.llm.model(provider),
        "active_sessions": active_sessions,
    }))
}
