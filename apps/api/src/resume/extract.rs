//! PDF Text Extractor — turns an uploaded resume into one immutable text string.
//!
//! Pages are extracted one at a time with lopdf. A page that fails extraction
//! contributes nothing; only a document that cannot be parsed at all is an error.
//! When every page comes back empty the whole document is retried once with
//! pdf-extract, which copes better with CID fonts.

use std::panic::{self, UnwindSafe};

use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Only PDF resumes are supported")]
    NotPdf,

    #[error("Could not read PDF: {0}")]
    Unparseable(String),
}

/// Extracted resume text. Built once per uploaded document and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeText {
    text: String,
    page_count: usize,
    pages_with_text: usize,
    used_fallback: bool,
    fingerprint: String,
}

impl ResumeText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn pages_with_text(&self) -> usize {
        self.pages_with_text
    }

    pub fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    /// SHA-256 of the uploaded bytes, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// True for scanned or image-only resumes.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A document viewed as numbered pages whose text can be pulled one at a time.
pub trait PageSource {
    /// Page numbers in reading order.
    fn page_numbers(&self) -> Vec<u32>;

    fn page_text(&self, page: u32) -> Result<String, String>;
}

impl PageSource for lopdf::Document {
    fn page_numbers(&self) -> Vec<u32> {
        // BTreeMap keys: already sorted
        self.get_pages().keys().copied().collect()
    }

    fn page_text(&self, page: u32) -> Result<String, String> {
        self.extract_text(&[page]).map_err(|e| e.to_string())
    }
}

/// Concatenated page text plus how many pages produced any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub text: String,
    pub page_count: usize,
    pub pages_with_text: usize,
    pub used_fallback: bool,
}

/// Joins the text of every page that yields some, newline-separated.
/// Pages that fail or come back blank are skipped.
pub fn concat_pages<S: PageSource + ?Sized>(source: &S) -> PageExtraction {
    let pages = source.page_numbers();
    let mut text = String::new();
    let mut pages_with_text = 0;

    for page in &pages {
        let page_text = match source.page_text(*page) {
            Ok(t) => t,
            Err(e) => {
                debug!(page, error = %e, "Page text extraction failed; skipping page");
                String::new()
            }
        };
        if page_text.trim().is_empty() {
            continue;
        }
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&page_text);
        pages_with_text += 1;
    }

    PageExtraction {
        text,
        page_count: pages.len(),
        pages_with_text,
        used_fallback: false,
    }
}

/// When no page yields text, takes the whole-document text instead, if there is any.
/// The text is then attributed to every page.
pub fn with_fallback<F>(mut extraction: PageExtraction, fallback: F) -> PageExtraction
where
    F: FnOnce() -> Option<String>,
{
    if extraction.pages_with_text > 0 || extraction.page_count == 0 {
        return extraction;
    }
    if let Some(text) = fallback() {
        extraction.text = text;
        extraction.pages_with_text = extraction.page_count;
        extraction.used_fallback = true;
    }
    extraction
}

/// SHA-256 fingerprint of an uploaded document, hex encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Accepts a declared PDF content type, a `.pdf` file name, or the PDF magic bytes.
pub fn looks_like_pdf(content_type: Option<&str>, file_name: Option<&str>, bytes: &[u8]) -> bool {
    let declared = content_type
        .map(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false);
    let named = file_name
        .map(|n| n.to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false);
    declared || named || bytes.starts_with(PDF_MAGIC)
}

/// Extracts the resume text from raw PDF bytes.
pub fn extract_resume_text(bytes: &[u8]) -> Result<ResumeText, DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::Empty);
    }

    let extraction = guard_panics(|| {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| DocumentError::Unparseable(e.to_string()))?;
        Ok(concat_pages(&doc))
    })?;
    let extraction = with_fallback(extraction, || whole_document_fallback(bytes));

    info!(
        pages = extraction.page_count,
        pages_with_text = extraction.pages_with_text,
        used_fallback = extraction.used_fallback,
        chars = extraction.text.len(),
        "Extracted resume text"
    );

    Ok(ResumeText {
        text: extraction.text,
        page_count: extraction.page_count,
        pages_with_text: extraction.pages_with_text,
        used_fallback: extraction.used_fallback,
        fingerprint: fingerprint(bytes),
    })
}

/// lopdf can panic on hostile cross-reference tables; that is a bad document, not a crash.
fn guard_panics<F>(read: F) -> Result<PageExtraction, DocumentError>
where
    F: FnOnce() -> Result<PageExtraction, DocumentError> + UnwindSafe,
{
    panic::catch_unwind(read).unwrap_or_else(|_| {
        warn!("lopdf panicked while reading document");
        Err(DocumentError::Unparseable(
            "PDF structure could not be read".to_string(),
        ))
    })
}

fn whole_document_fallback(bytes: &[u8]) -> Option<String> {
    // pdf-extract panics on some malformed font programs
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            debug!(error = %e, "pdf-extract fallback failed");
            None
        }
        Err(_) => {
            warn!("pdf-extract panicked while reading document");
            None
        }
    }
}

/// Runs extraction on the blocking pool; PDF parsing is CPU-bound.
pub async fn extract_in_background(bytes: Bytes) -> Result<ResumeText, AppError> {
    let result = tokio::task::spawn_blocking(move || extract_resume_text(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?;
    Ok(result?)
}
