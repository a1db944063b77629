use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{ApiKey, ProviderKind};

/// Endpoint, model and optional credential for one inference provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<ApiKey>,
}

/// Application configuration loaded from environment variables.
/// Provider keys are optional here: users may also enter a key per request.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub default_provider: ProviderKind,
    pub providers: HashMap<ProviderKind, ProviderSettings>,
    pub max_output_tokens: Option<u32>,
    pub max_prompt_chars: usize,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_provider = match get("INFERENCE_PROVIDER") {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .context("INFERENCE_PROVIDER must be one of huggingface, huggingface-qa, openrouter, together, openai")?,
            None => ProviderKind::HuggingFace,
        };

        let mut providers = HashMap::new();
        for kind in ProviderKind::ALL {
            let prefix = kind.env_prefix();
            let mut model = get(&format!("{prefix}_MODEL"))
                .unwrap_or_else(|| kind.default_model().to_string());
            if kind == default_provider {
                if let Some(m) = get("INFERENCE_MODEL") {
                    model = m;
                }
            }
            let base_url = get(&format!("{prefix}_BASE_URL"))
                .unwrap_or_else(|| kind.default_base_url().to_string());
            providers.insert(
                kind,
                ProviderSettings {
                    base_url: base_url.trim_end_matches('/').to_string(),
                    model,
                    api_key: get(kind.api_key_env()).map(ApiKey::new),
                },
            );
        }

        Ok(Config {
            port: parse_or(&get, "PORT", 8080u16)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            default_provider,
            providers,
            max_output_tokens: get("MAX_OUTPUT_TOKENS")
                .map(|v| v.parse::<u32>())
                .transpose()
                .context("MAX_OUTPUT_TOKENS must be a positive integer")?,
            max_prompt_chars: parse_or(&get, "MAX_PROMPT_CHARS", 24_000usize)?,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?,
            session_ttl: Duration::from_secs(parse_or(&get, "SESSION_TTL_SECS", 3600u64)?),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 120u64)?),
        })
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderSettings> {
        self.providers.get(&kind)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_provider, ProviderKind::HuggingFace);
        assert_eq!(config.max_prompt_chars, 24_000);
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert!(config.max_output_tokens.is_none());
        let hf = config.provider(ProviderKind::HuggingFace).unwrap();
        assert_eq!(hf.model, "mistralai/Mistral-7B-Instruct-v0.3");
        assert!(hf.api_key.is_none());
    }

    #[test]
    fn test_inference_model_only_overrides_default_provider() {
        let config = config_from(&[
            ("INFERENCE_PROVIDER", "openrouter"),
            ("INFERENCE_MODEL", "meta-llama/llama-3-8b-instruct"),
        ])
        .unwrap();
        assert_eq!(config.default_provider, ProviderKind::OpenRouter);
        assert_eq!(
            config.provider(ProviderKind::OpenRouter).unwrap().model,
            "meta-llama/llama-3-8b-instruct"
        );
        assert_eq!(
            config.provider(ProviderKind::OpenAi).unwrap().model,
            ProviderKind::OpenAi.default_model()
        );
    }

    #[test]
    fn test_qa_provider_shares_huggingface_key() {
        let config = config_from(&[("HUGGINGFACE_API_KEY", "hf_secret")]).unwrap();
        let qa = config.provider(ProviderKind::HuggingFaceQa).unwrap();
        assert_eq!(qa.api_key.as_ref().unwrap().expose(), "hf_secret");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = config_from(&[("OPENAI_BASE_URL", "http://localhost:9000/v1/")]).unwrap();
        assert_eq!(
            config.provider(ProviderKind::OpenAi).unwrap().base_url,
            "http://localhost:9000/v1"
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(config_from(&[("PORT", "not-a-port")]).is_err());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(config_from(&[("INFERENCE_PROVIDER", "anthropic")]).is_err());
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("OPENAI_API_KEY", "   "), ("PORT", "")]).unwrap();
        assert!(config.provider(ProviderKind::OpenAi).unwrap().api_key.is_none());
        assert_eq!(config.port, 8080);
    }
}
