//! DOCX export of improvement suggestions.

use std::io::Cursor;

use docx_rust::document::{Paragraph, Text, TextSpace};
use docx_rust::Docx;
use thiserror::Error;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const SUGGESTIONS_FILE_NAME: &str = "resume_suggestions.docx";

const TITLE: &str = "Resume Improvement Suggestions";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to build DOCX: {0}")]
    Build(String),
}

/// Renders the suggestions as a DOCX: a title line, then one plain paragraph per
/// non-blank line of the model output. Leading indentation is kept.
pub fn suggestions_docx(suggestions: &str) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::default();
    docx.document.push(Paragraph::default().push_text(TITLE));

    for line in suggestions.lines().filter(|l| !l.trim().is_empty()) {
        let text = Text::from((line.trim_end(), TextSpace::Preserve));
        docx.document.push(Paragraph::default().push_text(text));
    }

    let cursor = docx
        .write(Cursor::new(Vec::new()))
        .map_err(|e| ExportError::Build(format!("{e:?}")))?;
    Ok(cursor.into_inner())
}


#[cfg(test)]
mod tests {
    use super::read_back::paragraph_texts;
    use super::*;

    #[test]
    fn test_each_suggestion_line_is_its_own_paragraph() {
        let bytes = suggestions_docx("- Quantify impact\n\n- Add links").unwrap();
        assert_eq!(
            paragraph_texts(&bytes),
            vec![TITLE, "- Quantify impact", "- Add links"]
        );
    }

    #[test]
    fn test_leading_indentation_survives_and_trailing_space_is_dropped() {
        let bytes = suggestions_docx("Experience:\n    - Lead with metrics   \n").unwrap();
        assert_eq!(
            paragraph_texts(&bytes),
            vec![TITLE, "Experience:", "    - Lead with metrics"]
        );
    }

    #[test]
    fn test_suggestions_docx_is_a_zip_package() {
        let bytes = suggestions_docx("- Quantify impact\n\n- Add a skills section").unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_suggestions_still_produce_a_document() {
        let bytes = suggestions_docx("").unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert_eq!(paragraph_texts(&bytes), vec![TITLE]);
    }
}
