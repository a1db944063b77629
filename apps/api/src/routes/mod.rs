pub mod health;
pub mod index;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::resume::handlers as resume;
use crate::session::handlers as session;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(index::index_handler))
        .route("/health", get(health::health_handler))
        // Session API
        .route("/api/v1/sessions", post(session::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(session::handle_get_session).delete(session::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/preferences",
            patch(session::handle_update_preferences),
        )
        .route(
            "/api/v1/sessions/:id/history",
            get(session::handle_get_history).delete(session::handle_clear_history),
        )
        // Resume API
        .route(
            "/api/v1/sessions/:id/resume",
            post(resume::handle_upload_resume)
                .get(resume::handle_get_resume)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/v1/sessions/:id/ask", post(resume::handle_ask))
        .route(
            "/api/v1/sessions/:id/suggestions.docx",
            get(resume::handle_export_suggestions),
        )
        .with_state(state)
}
