//! LLM Client — the single point of entry for all inference calls in ResumeCopilot.
//!
//! ARCHITECTURAL RULE: No other module may call an inference API directly.
//! Provider wire formats live in `huggingface` and `chat_completions`, each behind
//! the `InferenceProvider` trait. `LlmClient` picks the provider and the credential.
//!
//! One POST per call. No retries, no backoff: every failure is reported to the caller.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod chat_completions;
pub mod huggingface;
pub mod prompts;

use chat_completions::ChatCompletionsProvider;
use huggingface::{QuestionAnsweringProvider, TextGenerationProvider};

/// Upper bound on any max-output-tokens value, whatever the caller asks for.
const MAX_TOKENS_CEILING: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider timed out: {0}")]
    Timeout(String),

    #[error("Unexpected response from provider: {0}")]
    Parse(String),

    #[error("Provider returned empty content")]
    EmptyContent,

    #[error("Provider {0} is not configured")]
    NotConfigured(String),

    #[error("No API key for {provider}: set {env_var} or supply an api_key with the request")]
    MissingApiKey {
        provider: String,
        env_var: &'static str,
    },
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Parse(err.to_string())
        } else if err.is_timeout() {
            LlmError::Timeout(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}

/// The outcome of one inference call: the model's text or a tagged failure.
pub type InferenceResult = Result<String, LlmError>;

/// The hosted inference backends ResumeCopilot knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "huggingface")]
    HuggingFace,
    #[serde(rename = "huggingface-qa")]
    HuggingFaceQa,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "together")]
    Together,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Error)]
#[error("unknown inference provider '{0}'")]
pub struct UnknownProvider(String);

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::HuggingFace,
        ProviderKind::HuggingFaceQa,
        ProviderKind::OpenRouter,
        ProviderKind::Together,
        ProviderKind::OpenAi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::HuggingFaceQa => "huggingface-qa",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Together => "together",
            ProviderKind::OpenAi => "openai",
        }
    }

    /// Prefix for the per-provider `{PREFIX}_MODEL` / `{PREFIX}_BASE_URL` variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace => "HUGGINGFACE",
            ProviderKind::HuggingFaceQa => "HUGGINGFACE_QA",
            ProviderKind::OpenRouter => "OPENROUTER",
            ProviderKind::Together => "TOGETHER",
            ProviderKind::OpenAi => "OPENAI",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace | ProviderKind::HuggingFaceQa => "HUGGINGFACE_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::Together => "TOGETHER_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace | ProviderKind::HuggingFaceQa => {
                "https://api-inference.huggingface.co"
            }
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Together => "https://api.together.xyz/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace => "mistralai/Mistral-7B-Instruct-v0.3",
            ProviderKind::HuggingFaceQa => "deepset/roberta-base-squad2",
            ProviderKind::OpenRouter => "mistralai/mistral-7b-instruct",
            ProviderKind::Together => "mistralai/Mixtral-8x7B-Instruct-v0.1",
            ProviderKind::OpenAi => "gpt-3.5-turbo",
        }
    }

    /// Output budget used when neither the request nor `MAX_OUTPUT_TOKENS` sets one.
    pub fn default_max_tokens(&self) -> u32 {
        match self {
            ProviderKind::HuggingFace | ProviderKind::HuggingFaceQa => 150,
            _ => 512,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// A provider credential. Never printed, never stored in a session.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Provider-neutral inference payload: persona instruction, resume text,
/// the question or task, and the output token budget.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub system: String,
    pub context: String,
    pub question: String,
    pub max_tokens: u32,
}

/// Marker separating the prompt from the completion in single-string prompts.
pub const ANSWER_MARKER: &str = "### Answer:";

impl InferenceRequest {
    /// Single-string layout for text-generation endpoints.
    pub fn render_plain(&self) -> String {
        format!(
            "{}\n\n### Context:\n{}\n\n### Question:\n{}\n\n{ANSWER_MARKER}",
            self.system, self.context, self.question
        )
    }

    /// User message for chat endpoints; the persona goes in the system message.
    pub fn render_user_message(&self) -> String {
        format!("Resume:\n{}\n\nQuestion:\n{}", self.context, self.question)
    }
}

/// Capability interface implemented once per provider wire format.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;

    async fn submit(&self, request: &InferenceRequest, api_key: &ApiKey) -> InferenceResult;
}

/// A successful completion and where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub text: String,
    pub provider: ProviderKind,
    pub model: String,
}

/// POSTs a JSON body with a bearer token and returns the raw success body.
/// Non-2xx statuses become `LlmError::Http` carrying the body verbatim.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    api_key: &ApiKey,
    headers: &[(&'static str, String)],
    body: &B,
) -> Result<String, LlmError> {
    let mut builder = client
        .post(url)
        .bearer_auth(api_key.expose())
        .header("content-type", "application/json")
        .json(body);
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }

    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        warn!("Inference API returned {}: {}", status, text);
        return Err(LlmError::Http {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(text)
}

/// The single LLM client used by all handlers in ResumeCopilot.
/// Holds one provider per kind plus the environment-sourced credentials.
#[derive(Clone)]
pub struct LlmClient {
    providers: HashMap<ProviderKind, Arc<dyn InferenceProvider>>,
    keys: HashMap<ProviderKind, ApiKey>,
    default_kind: ProviderKind,
    max_output_tokens: Option<u32>,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let mut client = Self::empty(config.default_provider, config.max_output_tokens);
        for kind in ProviderKind::ALL {
            let Some(settings) = config.provider(kind) else {
                continue;
            };
            let provider: Arc<dyn InferenceProvider> = match kind {
                ProviderKind::HuggingFace => Arc::new(TextGenerationProvider::new(
                    http.clone(),
                    &settings.base_url,
                    &settings.model,
                )),
                ProviderKind::HuggingFaceQa => Arc::new(QuestionAnsweringProvider::new(
                    http.clone(),
                    &settings.base_url,
                    &settings.model,
                )),
                ProviderKind::OpenRouter | ProviderKind::Together | ProviderKind::OpenAi => {
                    Arc::new(ChatCompletionsProvider::new(
                        kind,
                        http.clone(),
                        &settings.base_url,
                        &settings.model,
                    ))
                }
            };
            client = client.with_provider(provider);
            if let Some(key) = &settings.api_key {
                client = client.with_key(kind, key.clone());
            }
        }

        if !client.keys.contains_key(&client.default_kind) {
            warn!(
                "No {} set; requests to {} must carry an api_key",
                client.default_kind.api_key_env(),
                client.default_kind
            );
        }

        Ok(client)
    }

    pub fn empty(default_kind: ProviderKind, max_output_tokens: Option<u32>) -> Self {
        Self {
            providers: HashMap::new(),
            keys: HashMap::new(),
            default_kind,
            max_output_tokens,
        }
    }

    /// Registers (or replaces) the provider for its kind.
    pub fn with_provider(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn with_key(mut self, kind: ProviderKind, key: ApiKey) -> Self {
        self.keys.insert(kind, key);
        self
    }

    pub fn default_kind(&self) -> ProviderKind {
        self.default_kind
    }

    pub fn model(&self, kind: ProviderKind) -> Option<&str> {
        self.providers.get(&kind).map(|p| p.model())
    }

    /// Request value, else the configured budget, else the provider default. Never 0.
    pub fn max_tokens_for(&self, kind: ProviderKind, requested: Option<u32>) -> u32 {
        requested
            .or(self.max_output_tokens)
            .unwrap_or_else(|| kind.default_max_tokens())
            .clamp(1, MAX_TOKENS_CEILING)
    }

    /// A key supplied with the request wins over the environment key.
    pub fn resolve_key(&self, kind: ProviderKind, supplied: Option<&str>) -> Result<ApiKey, LlmError> {
        if let Some(key) = supplied.map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(ApiKey::new(key));
        }
        self.keys
            .get(&kind)
            .cloned()
            .ok_or(LlmError::MissingApiKey {
                provider: kind.to_string(),
                env_var: kind.api_key_env(),
            })
    }

    /// Sends one inference request to `kind` (or the configured default).
    pub async fn submit(
        &self,
        kind: Option<ProviderKind>,
        request: &InferenceRequest,
        supplied_key: Option<&str>,
    ) -> Result<Completion, LlmError> {
        let kind = kind.unwrap_or(self.default_kind);
        let provider = self
            .providers
            .get(&kind)
            .ok_or_else(|| LlmError::NotConfigured(kind.to_string()))?;
        let api_key = self.resolve_key(kind, supplied_key)?;

        info!(
            provider = %kind,
            model = provider.model(),
            context_chars = request.context.len(),
            max_tokens = request.max_tokens,
            "Submitting inference request"
        );

        let text = provider.submit(request, &api_key).await?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }

        debug!(provider = %kind, answer_chars = text.len(), "Inference call succeeded");

        Ok(Completion {
            text,
            provider: kind,
            model: provider.model().to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// In-memory provider that records requests and replays a canned result.
    pub struct StubProvider {
        pub kind: ProviderKind,
        pub reply: Mutex<Option<InferenceResult>>,
        pub seen: Mutex<Vec<(InferenceRequest, String)>>,
    }

    impl StubProvider {
        pub fn answering(kind: ProviderKind, answer: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: Mutex::new(Some(Ok(answer.to_string()))),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(kind: ProviderKind, err: LlmError) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reply: Mutex::new(Some(Err(err))),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl InferenceProvider for StubProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn submit(&self, request: &InferenceRequest, api_key: &ApiKey) -> InferenceResult {
            self.seen
                .lock()
                .unwrap()
                .push((request.clone(), api_key.expose().to_string()));
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }
}
