//! LLM providers. Each exposes an ordered list of model variants; the
//! orchestrator tries them in turn.

use crate::config::AiConfig;
use crate::utils::truncate_chars;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const BYTEZ_URL: &str = "https://api.bytez.com/models/v2/openai/v1/chat/completions";
const BYTEZ_MODELS: &[&str] = &[
    "HuggingFaceTB/SmolLM2-1.7B-Instruct",
    "Qwen/Qwen2.5-1.5B-Instruct",
    "TinyLlama/TinyLlama-1.1B-Chat-v1.0",
];
const BYTEZ_SYSTEM_PROMPT: &str = "You are an expert cybersecurity analyst specializing in Windows forensics and threat detection. Always respond with valid JSON only.";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODELS: &[&str] = &["gemini-1.5-flash", "gemini-1.5-flash-8b", "gemini-pro"];

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENROUTER_MODELS: &[&str] = &["mistralai/mistral-7b-instruct:free"];

/// Longest error body kept from a failed response
const ERROR_BODY_CHARS: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{0} API key not configured")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("Unexpected response shape: {0}")]
    Malformed(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("All providers failed ({attempts} attempts)")]
    Exhausted { attempts: usize },
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Model variants in the order they are tried.
    fn models(&self) -> Vec<String>;

    /// Budget for one attempt.
    fn timeout(&self) -> Duration;

    fn is_configured(&self) -> bool;

    /// Send `prompt` to `model` and return the raw response text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}

fn models(list: &[&str]) -> Vec<String> {
    list.iter().map(|m| m.to_string()).collect()
}

async fn send(request: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: truncate_chars(&body, ERROR_BODY_CHARS).to_string(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn text_at(value: &Value, pointer: &str) -> Result<String, ProviderError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Malformed(format!("no text at {}", pointer)))
}

/// Bytez OpenAI-compatible endpoint hosting small instruct models.
pub struct BytezProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    timeout: Duration,
    max_tokens: u32,
    temperature: f64,
}

impl BytezProvider {
    pub fn new(client: reqwest::Client, config: &AiConfig) -> Self {
        Self {
            client,
            api_key: config.bytez_api_key.clone(),
            timeout: Duration::from_secs(config.bytez_timeout_secs),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl Provider for BytezProvider {
    fn name(&self) -> &str {
        "bytez"
    }

    fn models(&self) -> Vec<String> {
        models(BYTEZ_MODELS)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("Bytez".to_string()))?;
        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": BYTEZ_SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        let request = self
            .client
            .post(BYTEZ_URL)
            .header("Authorization", key)
            .json(&body);
        let value = send(request).await?;
        text_at(&value, "/choices/0/message/content")
    }
}

/// Google Gemini `generateContent`.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    timeout: Duration,
    temperature: f64,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, config: &AiConfig) -> Self {
        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            timeout: Duration::from_secs(config.gemini_timeout_secs),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn models(&self) -> Vec<String> {
        models(GEMINI_MODELS)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("Gemini".to_string()))?;
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, model);
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": self.temperature},
        });
        let request = self.client.post(url).query(&[("key", key)]).json(&body);
        let value = send(request).await?;
        text_at(&value, "/candidates/0/content/parts/0/text")
    }
}

/// OpenRouter free-tier chat completions.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    timeout: Duration,
    temperature: f64,
}

impl OpenRouterProvider {
    pub fn new(client: reqwest::Client, config: &AiConfig) -> Self {
        Self {
            client,
            api_key: config.openrouter_api_key.clone(),
            timeout: Duration::from_secs(config.openrouter_timeout_secs),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn models(&self) -> Vec<String> {
        models(OPENROUTER_MODELS)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OpenRouter".to_string()))?;
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
        });
        let request = self.client.post(OPENROUTER_URL).bearer_auth(key).json(&body);
        let value = send(request).await?;
        text_at(&value, "/choices/0/message/content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_at_reads_nested_content() {
        let value = json!({"choices": [{"message": {"content": "{\"risk_score\": 5}"}}]});
        assert_eq!(
            text_at(&value, "/choices/0/message/content").unwrap(),
            "{\"risk_score\": 5}"
        );
        assert!(matches!(
            text_at(&json!({"choices": []}), "/choices/0/message/content"),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_providers_follow_config() {
        let config = AiConfig {
            gemini_api_key: Some("g".to_string()),
            ..AiConfig::default()
        };
        let client = reqwest::Client::new();
        let bytez = BytezProvider::new(client.clone(), &config);
        let gemini = GeminiProvider::new(client.clone(), &config);
        let openrouter = OpenRouterProvider::new(client, &config);

        assert!(!bytez.is_configured());
        assert!(gemini.is_configured());
        assert!(!openrouter.is_configured());
        assert_eq!(bytez.models().len(), 3);
        assert_eq!(gemini.models()[0], "gemini-1.5-flash");
        assert_eq!(bytez.timeout(), Duration::from_secs(120));
        assert_eq!(openrouter.timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_refuses() {
        let provider = OpenRouterProvider::new(reqwest::Client::new(), &AiConfig::default());
        let err = provider.complete("m", "p").await.unwrap_err();
        assert_eq!(err, ProviderError::NotConfigured("OpenRouter".to_string()));
    }
}
