//! Prompt Assembler — persona instruction + resume text + question or task.
//!
//! Resume text and the user's question are always embedded verbatim. Instead of
//! truncating long input, assembly refuses prompts over the configured character
//! limit so the caller can shorten the resume.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::prompts::PERSONA_SYSTEM;
use crate::llm_client::InferenceRequest;
use crate::resume::extract::ResumeText;
use crate::resume::prompts::{IMPROVE_TASK, JOB_MATCH_TASK_TEMPLATE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("question cannot be empty")]
    EmptyQuestion,

    #[error("job_role cannot be empty in job_match mode")]
    EmptyRole,

    #[error("no text could be extracted from the uploaded resume")]
    EmptyResume,

    #[error("resume and question are {len} characters; the limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// The fixed set of actions a user can run against their resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Ask,
    Improve,
    JobMatch,
}

/// A mode together with its user-supplied input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Ask { question: String },
    Improve,
    JobMatch { role: String },
}

impl Task {
    /// Builds a task from the loosely-typed form fields, rejecting blank input.
    pub fn from_parts(
        mode: Mode,
        question: Option<&str>,
        role: Option<&str>,
    ) -> Result<Self, PromptError> {
        match mode {
            Mode::Ask => match question.filter(|q| !q.trim().is_empty()) {
                Some(q) => Ok(Task::Ask {
                    question: q.to_string(),
                }),
                None => Err(PromptError::EmptyQuestion),
            },
            Mode::Improve => Ok(Task::Improve),
            Mode::JobMatch => match role.filter(|r| !r.trim().is_empty()) {
                Some(r) => Ok(Task::JobMatch {
                    role: r.trim().to_string(),
                }),
                None => Err(PromptError::EmptyRole),
            },
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Task::Ask { .. } => Mode::Ask,
            Task::Improve => Mode::Improve,
            Task::JobMatch { .. } => Mode::JobMatch,
        }
    }

    /// The text placed in the question slot of the prompt.
    pub fn instruction(&self) -> String {
        match self {
            Task::Ask { question } => question.clone(),
            Task::Improve => IMPROVE_TASK.to_string(),
            Task::JobMatch { role } => JOB_MATCH_TASK_TEMPLATE.replace("{role}", role),
        }
    }

    /// How the turn is labelled in chat history.
    pub fn label(&self) -> String {
        match self {
            Task::Ask { question } => question.clone(),
            Task::Improve => "Improve my resume".to_string(),
            Task::JobMatch { role } => format!("Job match: {role}"),
        }
    }
}

/// An assembled prompt, ready to be bound to a token budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub context: String,
    pub question: String,
}

impl Prompt {
    pub fn into_request(self, max_tokens: u32) -> InferenceRequest {
        InferenceRequest {
            system: self.system,
            context: self.context,
            question: self.question,
            max_tokens,
        }
    }

    pub fn input_chars(&self) -> usize {
        self.context.chars().count() + self.question.chars().count()
    }
}

pub fn assemble(resume: &ResumeText, task: &Task, max_chars: usize) -> Result<Prompt, PromptError> {
    assemble_text(resume.as_str(), task, max_chars)
}

pub fn assemble_text(resume_text: &str, task: &Task, max_chars: usize) -> Result<Prompt, PromptError> {
    if resume_text.trim().is_empty() {
        return Err(PromptError::EmptyResume);
    }

    let prompt = Prompt {
        system: PERSONA_SYSTEM.to_string(),
        context: resume_text.to_string(),
        question: task.instruction(),
    };

    let len = prompt.input_chars();
    if len > max_chars {
        return Err(PromptError::TooLong {
            len,
            max: max_chars,
        });
    }

    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jane Doe\nSenior Rust Engineer at Acme (2019-2024)\nSkills: Rust, Tokio, Kubernetes";

    #[test]
    fn test_ask_prompt_contains_resume_and_question_verbatim() {
        let task = Task::from_parts(Mode::Ask, Some("What are my strengths?"), None).unwrap();
        let prompt = assemble_text(RESUME, &task, 24_000).unwrap();
        let rendered = prompt.clone().into_request(150).render_plain();

        assert!(rendered.contains(RESUME));
        assert!(rendered.contains("What are my strengths?"));
        assert_eq!(prompt.system, PERSONA_SYSTEM);
    }

    #[test]
    fn test_question_keeps_surrounding_whitespace() {
        let task = Task::from_parts(Mode::Ask, Some("  Am I senior?  "), None).unwrap();
        let prompt = assemble_text(RESUME, &task, 24_000).unwrap();
        assert_eq!(prompt.question, "  Am I senior?  ");
    }

    #[test]
    fn test_blank_question_is_rejected() {
        assert_eq!(
            Task::from_parts(Mode::Ask, Some("   "), None),
            Err(PromptError::EmptyQuestion)
        );
        assert_eq!(
            Task::from_parts(Mode::Ask, None, None),
            Err(PromptError::EmptyQuestion)
        );
    }

    #[test]
    fn test_improve_uses_fixed_instruction() {
        let task = Task::from_parts(Mode::Improve, Some("ignored"), None).unwrap();
        let prompt = assemble_text(RESUME, &task, 24_000).unwrap();
        assert_eq!(prompt.question, IMPROVE_TASK);
        assert_eq!(task.label(), "Improve my resume");
    }

    #[test]
    fn test_job_match_embeds_role() {
        let task = Task::from_parts(Mode::JobMatch, None, Some("Staff Platform Engineer")).unwrap();
        let prompt = assemble_text(RESUME, &task, 24_000).unwrap();
        assert!(prompt.question.contains("Staff Platform Engineer"));
        assert!(!prompt.question.contains("{role}"));
        assert_eq!(task.mode(), Mode::JobMatch);
    }

    #[test]
    fn test_job_match_requires_role() {
        assert_eq!(
            Task::from_parts(Mode::JobMatch, Some("question"), Some("")),
            Err(PromptError::EmptyRole)
        );
    }

    #[test]
    fn test_oversized_input_is_rejected_not_truncated() {
        let task = Task::Ask {
            question: "Summarize".to_string(),
        };
        let long_resume = "x".repeat(100);
        let err = assemble_text(&long_resume, &task, 50).unwrap_err();
        assert_eq!(err, PromptError::TooLong { len: 109, max: 50 });
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        let task = Task::Ask {
            question: "ok".to_string(),
        };
        // 10 two-byte characters + 2
        let resume = "é".repeat(10);
        assert!(assemble_text(&resume, &task, 12).is_ok());
        assert!(assemble_text(&resume, &task, 11).is_err());
    }

    #[test]
    fn test_empty_resume_is_rejected() {
        let task = Task::Improve;
        assert_eq!(
            assemble_text(" \n ", &task, 24_000),
            Err(PromptError::EmptyResume)
        );
    }

    #[test]
    fn test_mode_serde_is_snake_case() {
        let mode: Mode = serde_json::from_str(r#""job_match""#).unwrap();
        assert_eq!(mode, Mode::JobMatch);
        assert_eq!(serde_json::to_string(&Mode::Ask).unwrap(), r#""ask""#);
    }
}
