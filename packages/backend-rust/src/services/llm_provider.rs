use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_MAX_RETRIES: usize = 0;
const BASE_BACKOFF_MS: u64 = 200;

/// Sampling parameters sent with every completion request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
    pub max_retries: usize,
    pub sampling: SamplingOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn from_env() -> Self {
        let api_key = env_string("LLM_API_KEY");
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = env_string("LLM_API_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));
        let max_retries = env_u64("LLM_MAX_RETRIES")
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_RETRIES);

        Self::new(LLMConfig {
            api_key,
            model,
            api_endpoint,
            timeout,
            max_retries,
            sampling: SamplingOptions::default(),
        })
    }

    pub fn new(config: LLMConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn is_available(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LLMError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(LLMError::NotConfigured("LLM_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.api_endpoint);
        let sampling = self.config.sampling;
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": sampling.temperature,
            "top_p": sampling.top_p,
            "max_tokens": sampling.max_tokens,
            "stream": false
        });

        self.post_with_retry(&url, api_key, &payload).await
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, LLMError> {
        let max_retries = self.config.max_retries;
        let mut retry = 0;

        loop {
            let err = match self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(payload)
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        return serde_json::from_slice(&bytes).map_err(|e| {
                            tracing::error!(error = %e, "failed to parse LLM response JSON");
                            LLMError::Json(e)
                        });
                    }
                    let body = resp.text().await.unwrap_or_default();
                    if !is_retryable(status) {
                        return Err(LLMError::HttpStatus { status, body });
                    }
                    LLMError::HttpStatus { status, body }
                }
                Err(e) => LLMError::Request(e),
            };

            if retry >= max_retries {
                return Err(err);
            }
            let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry.min(6)));
            warn!(retry, error = %err, "LLM request failed, retrying");
            sleep(backoff).await;
            retry += 1;
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> LLMConfig {
        LLMConfig {
            api_key: api_key.map(str::to_string),
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
            max_retries: 0,
            sampling: SamplingOptions::default(),
        }
    }

    #[test]
    fn test_availability_requires_key() {
        assert!(!LLMProvider::new(config(None)).is_available());
        assert!(!LLMProvider::new(config(Some("  "))).is_available());
        assert!(LLMProvider::new(config(Some("k"))).is_available());
    }

    #[tokio::test]
    async fn test_chat_without_key_fails_fast() {
        let provider = LLMProvider::new(config(None));
        let err = provider.chat(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, LLMError::NotConfigured("LLM_API_KEY")));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(reqwest::StatusCode::BAD_REQUEST));
    }
}
