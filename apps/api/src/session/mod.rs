//! Session context — the per-user state handlers operate on.
//!
//! A session owns the extracted resume text, the chat history and the user's
//! display preferences. Sessions live in memory only and end either explicitly
//! or after `SESSION_TTL_SECS` without a request.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::llm_client::ProviderKind;
use crate::resume::assembler::Mode;
use crate::resume::extract::ResumeText;

pub type SessionId = Uuid;

/// One question/answer exchange.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub mode: Mode,
    pub provider: ProviderKind,
    pub asked_at: DateTime<Utc>,
}

/// Append-only list of turns; the only other mutation is a full clear.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn push(&mut self, turn: ChatTurn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns how many turns were dropped.
    pub fn clear(&mut self) -> usize {
        let cleared = self.turns.len();
        self.turns.clear();
        cleared
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    resume: Option<Arc<ResumeText>>,
    pub history: ChatHistory,
    pub dark_mode: bool,
    latest_suggestions: Option<String>,
    pub created_at: DateTime<Utc>,
    last_seen: Instant,
}

impl Session {
    pub fn new(dark_mode: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            resume: None,
            history: ChatHistory::default(),
            dark_mode,
            latest_suggestions: None,
            created_at: Utc::now(),
            last_seen: Instant::now(),
        }
    }

    pub fn resume(&self) -> Option<Arc<ResumeText>> {
        self.resume.clone()
    }

    /// True when `fingerprint` is the document already extracted for this session.
    pub fn has_document(&self, fingerprint: &str) -> bool {
        self.resume
            .as_ref()
            .map(|r| r.fingerprint() == fingerprint)
            .unwrap_or(false)
    }

    /// Replaces the resume with a newly uploaded document. Suggestions made for the
    /// previous document no longer apply; chat history is kept.
    pub fn attach_resume(&mut self, resume: ResumeText) -> Arc<ResumeText> {
        let resume = Arc::new(resume);
        self.resume = Some(resume.clone());
        self.latest_suggestions = None;
        resume
    }

    pub fn record_suggestions(&mut self, suggestions: String) {
        self.latest_suggestions = Some(suggestions);
    }

    pub fn latest_suggestions(&self) -> Option<&str> {
        self.latest_suggestions.as_deref()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            dark_mode: self.dark_mode,
            resume: self.resume.as_deref().map(ResumeSummary::from),
            turns: self.history.len(),
            has_suggestions: self.latest_suggestions.is_some(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeSummary {
    pub fingerprint: String,
    pub page_count: usize,
    pub pages_with_text: usize,
    pub characters: usize,
    pub is_empty: bool,
    /// Text came from the whole-document reader rather than page by page.
    pub used_fallback: bool,
}

impl From<&ResumeText> for ResumeSummary {
    fn from(resume: &ResumeText) -> Self {
        Self {
            fingerprint: resume.fingerprint().to_string(),
            page_count: resume.page_count(),
            pages_with_text: resume.pages_with_text(),
            characters: resume.char_count(),
            is_empty: resume.is_empty(),
            used_fallback: resume.used_fallback(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub dark_mode: bool,
    pub resume: Option<ResumeSummary>,
    pub turns: usize,
    pub has_suggestions: bool,
    pub created_at: DateTime<Utc>,
}

/// In-memory session map shared by all handlers through `AppState`.
/// The lock is only held inside `with_session` closures, never across network I/O.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(&self, dark_mode: bool) -> SessionSummary {
        let session = Session::new(dark_mode);
        let summary = session.summary();
        let mut sessions = self.sessions.lock().await;
        evict_expired(&mut sessions, self.ttl);
        sessions.insert(session.id, session);
        info!(session_id = %summary.id, active = sessions.len(), "Session created");
        summary
    }

    /// Runs `f` against a live session and marks it as used.
    /// Returns `None` for unknown or expired sessions.
    pub async fn with_session<F, R>(&self, id: SessionId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.sessions.lock().await;
        evict_expired(&mut sessions, self.ttl);
        let session = sessions.get_mut(&id)?;
        session.last_seen = Instant::now();
        Some(f(session))
    }

    pub async fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.lock().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        evict_expired(&mut sessions, self.ttl);
        sessions.len()
    }
}

fn evict_expired(sessions: &mut HashMap<SessionId, Session>, ttl: Duration) {
    let before = sessions.len();
    sessions.retain(|_, s| s.last_seen.elapsed() <= ttl);
    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!(evicted, "Evicted idle sessions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::extract::{extract_resume_text, fixtures::pdf_with_pages};

    fn turn(question: &str) -> ChatTurn {
        ChatTurn {
            question: question.to_string(),
            answer: "answer".to_string(),
            mode: Mode::Ask,
            provider: ProviderKind::HuggingFace,
            asked_at: Utc::now(),
        }
    }

    #[test]
    fn test_history_appends_in_order() {
        let mut history = ChatHistory::default();
        assert_eq!(history.push(turn("first")), 0);
        assert_eq!(history.push(turn("second")), 1);
        let questions: Vec<_> = history.turns().iter().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["first", "second"]);
    }

    #[test]
    fn test_clear_resets_history_regardless_of_length() {
        for n in [0usize, 1, 7] {
            let mut history = ChatHistory::default();
            for i in 0..n {
                history.push(turn(&format!("q{i}")));
            }
            assert_eq!(history.clear(), n);
            assert!(history.is_empty());
            assert_eq!(history.len(), 0);
        }
    }

    #[test]
    fn test_new_document_replaces_resume_and_drops_suggestions() {
        let mut session = Session::new(false);
        let first = extract_resume_text(&pdf_with_pages(&[Some("Version one")])).unwrap();
        let first_fp = first.fingerprint().to_string();
        session.attach_resume(first);
        session.record_suggestions("- add metrics".to_string());
        session.history.push(turn("q"));
        assert!(session.has_document(&first_fp));

        let second = extract_resume_text(&pdf_with_pages(&[Some("Version two")])).unwrap();
        session.attach_resume(second);
        assert!(!session.has_document(&first_fp));
        assert!(session.latest_suggestions().is_none());
        assert_eq!(session.history.len(), 1);
    }

    #[tokio::test]
    async fn test_with_session_returns_none_for_unknown_id() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.with_session(Uuid::new_v4(), |_| ()).await.is_none());
    }

    #[tokio::test]
    async fn test_mutations_persist_between_calls() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.create(false).await.id;
        store
            .with_session(id, |s| {
                s.dark_mode = true;
                s.history.push(turn("q"));
            })
            .await
            .unwrap();
        let summary = store.with_session(id, |s| s.summary()).await.unwrap();
        assert!(summary.dark_mode);
        assert_eq!(summary.turns, 1);
    }

    #[tokio::test]
    async fn test_remove_ends_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.create(false).await.id;
        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire_and_active_ones_survive() {
        let store = SessionStore::new(Duration::from_secs(60));
        let idle = store.create(false).await.id;
        let active = store.create(false).await.id;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(store.with_session(active, |_| ()).await.is_some());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(store.with_session(idle, |_| ()).await.is_none());
        assert!(store.with_session(active, |_| ()).await.is_some());
        assert_eq!(store.len().await, 1);
    }
}
