//! Hugging Face Inference API providers.
//!
//! Two response shapes come back from `/models/{model}`:
//! text-generation models return a list of `{"generated_text": ...}` objects,
//! extractive question-answering models return a flat `{"answer": ...}` object.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    post_json, ApiKey, InferenceProvider, InferenceRequest, InferenceResult, LlmError,
    ProviderKind, ANSWER_MARKER,
};

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Some deployments return a bare object instead of a one-element list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    List(Vec<GeneratedText>),
    Single(GeneratedText),
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: String,
}

/// Text-generation endpoint (e.g. Mistral-7B-Instruct). The prompt is sent as a
/// single string and the completion is whatever follows the answer marker.
pub struct TextGenerationProvider {
    client: Client,
    url: String,
    model: String,
}

impl TextGenerationProvider {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            url: format!("{}/models/{model}", base_url.trim_end_matches('/')),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl InferenceProvider for TextGenerationProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn submit(&self, request: &InferenceRequest, api_key: &ApiKey) -> InferenceResult {
        let prompt = request.render_plain();
        let body = GenerationRequest {
            inputs: &prompt,
            parameters: GenerationParameters {
                max_new_tokens: request.max_tokens,
            },
        };

        let raw = post_json(&self.client, &self.url, api_key, &[], &body).await?;
        let parsed: GenerationResponse =
            serde_json::from_str(&raw).map_err(|e| LlmError::Parse(e.to_string()))?;

        let generated = match parsed {
            GenerationResponse::List(items) => items
                .into_iter()
                .next()
                .map(|g| g.generated_text)
                .ok_or(LlmError::EmptyContent)?,
            GenerationResponse::Single(g) => g.generated_text,
        };

        Ok(answer_after_marker(&generated).to_string())
    }
}

/// Extractive QA endpoint (e.g. roberta-base-squad2). Takes the question and the
/// resume as separate fields; there is no output token budget to send.
pub struct QuestionAnsweringProvider {
    client: Client,
    url: String,
    model: String,
}

impl QuestionAnsweringProvider {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            url: format!("{}/models/{model}", base_url.trim_end_matches('/')),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl InferenceProvider for QuestionAnsweringProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFaceQa
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn submit(&self, request: &InferenceRequest, api_key: &ApiKey) -> InferenceResult {
        let body = json!({
            "inputs": {
                "question": request.question,
                "context": request.context,
            }
        });

        let raw = post_json(&self.client, &self.url, api_key, &[], &body).await?;
        let parsed: AnswerResponse =
            serde_json::from_str(&raw).map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(parsed.answer)
    }
}

/// Text-generation models echo the prompt; keep only what follows the last marker.
fn answer_after_marker(generated: &str) -> &str {
    generated
        .rsplit(ANSWER_MARKER)
        .next()
        .unwrap_or(generated)
        .trim()
}
