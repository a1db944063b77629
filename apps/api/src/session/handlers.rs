//! Axum route handlers for session lifecycle, preferences and chat history.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::session::{ChatTurn, SessionId, SessionSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub dark_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct PreferencesRequest {
    pub dark_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ClearHistoryResponse {
    pub cleared: usize,
}

pub(crate) fn session_not_found(id: SessionId) -> AppError {
    AppError::NotFound(format!("Session {id} not found or expired"))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> (StatusCode, Json<SessionSummary>) {
    let dark_mode = request.map(|Json(r)| r.dark_mode).unwrap_or(false);
    let summary = state.sessions.create(dark_mode).await;
    (StatusCode::CREATED, Json(summary))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionSummary>, AppError> {
    state
        .sessions
        .with_session(id, |s| s.summary())
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(id))
    }
}

/// PATCH /api/v1/sessions/:id/preferences
pub async fn handle_update_preferences(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<PreferencesRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    state
        .sessions
        .with_session(id, |s| {
            s.dark_mode = request.dark_mode;
            s.summary()
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// GET /api/v1/sessions/:id/history
pub async fn handle_get_history(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<HistoryResponse>, AppError> {
    let turns = state
        .sessions
        .with_session(id, |s| s.history.turns().to_vec())
        .await
        .ok_or_else(|| session_not_found(id))?;
    Ok(Json(HistoryResponse { turns }))
}

/// DELETE /api/v1/sessions/:id/history
pub async fn handle_clear_history(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<ClearHistoryResponse>, AppError> {
    let cleared = state
        .sessions
        .with_session(id, |s| s.history.clear())
        .await
        .ok_or_else(|| session_not_found(id))?;
    tracing::info!(session_id = %id, cleared, "Chat history cleared");
    Ok(Json(ClearHistoryResponse { cleared }))
}
