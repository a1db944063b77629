//! Axum route handlers for resume upload, questions and suggestion export.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::ProviderKind;
use crate::resume::assembler::{assemble, Mode, Task};
use crate::resume::export::{suggestions_docx, DOCX_CONTENT_TYPE, SUGGESTIONS_FILE_NAME};
use crate::resume::extract::{extract_in_background, fingerprint, looks_like_pdf, DocumentError};
use crate::session::handlers::session_not_found;
use crate::session::{ChatTurn, ResumeSummary, SessionId};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub resume: ResumeSummary,
    /// True when the same document was already extracted for this session.
    pub cached: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResumePreviewResponse {
    pub text: String,
    pub resume: ResumeSummary,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub mode: Mode,
    pub question: Option<String>,
    pub job_role: Option<String>,
    /// Overrides the environment key for this request only. Never stored.
    pub api_key: Option<String>,
    pub provider: Option<ProviderKind>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub mode: Mode,
    pub provider: ProviderKind,
    pub model: String,
    pub turn_index: usize,
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

const EMPTY_TEXT_WARNING: &str =
    "No text could be extracted from this PDF. It may be a scanned image; upload a text-based PDF.";

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/:id/resume
///
/// Multipart upload, field `file`. Extraction runs once per distinct document:
/// re-uploading the same bytes returns the cached text.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    state
        .sessions
        .with_session(id, |_| ())
        .await
        .ok_or_else(|| session_not_found(id))?;

    let upload = read_file_field(multipart).await?;
    if !looks_like_pdf(
        upload.content_type.as_deref(),
        upload.file_name.as_deref(),
        &upload.bytes,
    ) {
        return Err(DocumentError::NotPdf.into());
    }

    let fp = fingerprint(&upload.bytes);
    let cached = state
        .sessions
        .with_session(id, |s| {
            if s.has_document(&fp) {
                s.resume()
            } else {
                None
            }
        })
        .await
        .ok_or_else(|| session_not_found(id))?;

    if let Some(resume) = cached {
        info!(session_id = %id, "Resume already extracted; reusing text");
        return Ok(Json(UploadResponse {
            warning: resume.is_empty().then(|| EMPTY_TEXT_WARNING.to_string()),
            resume: ResumeSummary::from(resume.as_ref()),
            cached: true,
        }));
    }

    info!(
        session_id = %id,
        file_name = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        bytes = upload.bytes.len(),
        "Extracting uploaded resume"
    );
    let resume = extract_in_background(upload.bytes).await?;

    let resume = state
        .sessions
        .with_session(id, |s| s.attach_resume(resume))
        .await
        .ok_or_else(|| session_not_found(id))?;

    Ok(Json(UploadResponse {
        warning: resume.is_empty().then(|| EMPTY_TEXT_WARNING.to_string()),
        resume: ResumeSummary::from(resume.as_ref()),
        cached: false,
    }))
}

/// GET /api/v1/sessions/:id/resume
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<ResumePreviewResponse>, AppError> {
    let resume = state
        .sessions
        .with_session(id, |s| s.resume())
        .await
        .ok_or_else(|| session_not_found(id))?
        .ok_or_else(no_resume)?;

    Ok(Json(ResumePreviewResponse {
        text: resume.as_str().to_string(),
        resume: ResumeSummary::from(resume.as_ref()),
    }))
}

/// POST /api/v1/sessions/:id/ask
///
/// Answers a question, or runs the improve / job match task, against the
/// session's resume. Failed calls leave the chat history untouched.
pub async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let task = Task::from_parts(
        request.mode,
        request.question.as_deref(),
        request.job_role.as_deref(),
    )?;

    let resume = state
        .sessions
        .with_session(id, |s| s.resume())
        .await
        .ok_or_else(|| session_not_found(id))?
        .ok_or_else(no_resume)?;

    let prompt = assemble(&resume, &task, state.config.max_prompt_chars)?;
    let kind = request.provider.unwrap_or_else(|| state.llm.default_kind());
    let inference = prompt.into_request(state.llm.max_tokens_for(kind, request.max_tokens));

    let completion = state
        .llm
        .submit(Some(kind), &inference, request.api_key.as_deref())
        .await?;

    let turn = ChatTurn {
        question: task.label(),
        answer: completion.text.clone(),
        mode: task.mode(),
        provider: completion.provider,
        asked_at: Utc::now(),
    };
    let turn_index = state
        .sessions
        .with_session(id, |s| {
            if task.mode() == Mode::Improve {
                s.record_suggestions(completion.text.clone());
            }
            s.history.push(turn)
        })
        .await
        .ok_or_else(|| session_not_found(id))?;

    Ok(Json(AskResponse {
        answer: completion.text,
        mode: task.mode(),
        provider: completion.provider,
        model: completion.model,
        turn_index,
    }))
}

/// GET /api/v1/sessions/:id/suggestions.docx
///
/// Latest improvement suggestions as a Word document.
pub async fn handle_export_suggestions(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse, AppError> {
    let suggestions = state
        .sessions
        .with_session(id, |s| s.latest_suggestions().map(str::to_string))
        .await
        .ok_or_else(|| session_not_found(id))?
        .ok_or_else(|| {
            AppError::NotFound("No improvement suggestions yet; run improve mode first".to_string())
        })?;

    let docx = suggestions_docx(&suggestions)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SUGGESTIONS_FILE_NAME}\""),
            ),
        ],
        docx,
    ))
}

fn no_resume() -> AppError {
    AppError::NotFound("No resume uploaded for this session".to_string())
}

/// Reads the `file` field (or the first field carrying a file name).
async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if !is_file {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(DocumentError::Empty.into());
        }
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(AppError::Validation(
        "multipart body must contain a PDF in the 'file' field".to_string(),
    ))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadTooLarge(err.body_text())
    } else {
        AppError::Validation(err.body_text())
    }
}
