//! OpenAI-compatible `/chat/completions` providers: OpenAI, OpenRouter and Together AI.
//! All three accept the same request and answer in `choices[0].message.content`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    post_json, ApiKey, InferenceProvider, InferenceRequest, InferenceResult, LlmError,
    ProviderKind,
};

/// Sent to OpenRouter so requests are attributed to the app.
const OPENROUTER_REFERER: &str = "https://github.com/resume-copilot";
const OPENROUTER_TITLE: &str = "ResumeCopilot";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct ChatCompletionsProvider {
    kind: ProviderKind,
    client: Client,
    url: String,
    model: String,
    headers: Vec<(&'static str, String)>,
}

impl ChatCompletionsProvider {
    pub fn new(kind: ProviderKind, client: Client, base_url: &str, model: &str) -> Self {
        let headers = match kind {
            ProviderKind::OpenRouter => vec![
                ("HTTP-Referer", OPENROUTER_REFERER.to_string()),
                ("X-Title", OPENROUTER_TITLE.to_string()),
            ],
            _ => Vec::new(),
        };

        Self {
            kind,
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            headers,
        }
    }
}

#[async_trait]
impl InferenceProvider for ChatCompletionsProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn submit(&self, request: &InferenceRequest, api_key: &ApiKey) -> InferenceResult {
        let user = request.render_user_message();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            max_tokens: request.max_tokens,
        };

        let raw = post_json(&self.client, &self.url, api_key, &self.headers, &body).await?;
        let parsed: ChatResponse =
            serde_json::from_str(&raw).map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> InferenceRequest {
        InferenceRequest {
            system: "You are a career coach.".to_string(),
            context: "Jane Doe. Rust, Kubernetes.".to_string(),
            question: "What are my strengths?".to_string(),
            max_tokens: 512,
        }
    }

    const OK_BODY: &str = r#"{
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "Systems programming in Rust."}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 40, "completion_tokens": 6, "total_tokens": 46}
    }"#;

    #[tokio::test]
    async fn test_openai_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 512,
                "messages": [
                    {"role": "system", "content": "You are a career coach."}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new(
            ProviderKind::OpenAi,
            Client::new(),
            &server.url(),
            "gpt-3.5-turbo",
        );
        let answer = provider.submit(&request(), &ApiKey::new("sk-test")).await.unwrap();

        assert_eq!(answer, "Systems programming in Rust.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_user_message_carries_resume_and_question() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("Jane Doe. Rust, Kubernetes.".to_string()),
                Matcher::Regex("What are my strengths\\?".to_string()),
            ]))
            .with_status(200)
            .with_body(OK_BODY)
            .create_async()
            .await;

        let provider =
            ChatCompletionsProvider::new(ProviderKind::Together, Client::new(), &server.url(), "m");
        provider.submit(&request(), &ApiKey::new("k")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openrouter_sends_attribution_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("x-title", OPENROUTER_TITLE)
            .match_header("http-referer", OPENROUTER_REFERER)
            .with_status(200)
            .with_body(OK_BODY)
            .create_async()
            .await;

        let provider = ChatCompletionsProvider::new(
            ProviderKind::OpenRouter,
            Client::new(),
            &server.url(),
            "mistralai/mistral-7b-instruct",
        );
        provider.submit(&request(), &ApiKey::new("k")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_http_error_with_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .create_async()
            .await;

        let provider =
            ChatCompletionsProvider::new(ProviderKind::OpenAi, Client::new(), &server.url(), "m");
        let err = provider
            .submit(&request(), &ApiKey::new("bad"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Http { status: 401, .. }));
        assert!(err.to_string().starts_with("Error: 401 - "));
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider =
            ChatCompletionsProvider::new(ProviderKind::OpenAi, Client::new(), &server.url(), "m");
        let err = provider
            .submit(&request(), &ApiKey::new("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let provider =
            ChatCompletionsProvider::new(ProviderKind::OpenAi, Client::new(), &server.url(), "m");
        let err = provider
            .submit(&request(), &ApiKey::new("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }
}
