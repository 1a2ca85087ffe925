//! Chat-completion client abstraction and the OpenAI-compatible implementation.
//!
//! The summarizer only needs one call shape: a system instruction, a user
//! message, an output-token cap, and a temperature, returning plain text.
//! [`ChatClient`] captures that so tests can substitute a scripted client.
//!
//! # Retry Strategy
//!
//! [`OpenAiChatClient`] retries only when `max_retries > 0`:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Connection errors → retry
//! - Backoff: 1s, 2s, 4s, ... (capped at 2^5)
//!
//! All attempts and backoff sleeps share the summarizer's single
//! `timeout_secs` ceiling per call. A request that itself runs that long
//! uses up the whole budget, so slow responses are never retried; retries
//! only help with fast failures.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{LlmConfig, SummarizationConfig};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// One chat-completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Model identifier used for requests (e.g. `"gpt-3.5-turbo"`).
    fn model_name(&self) -> &str;

    /// Run one completion and return the assistant text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Client for any endpoint speaking the OpenAI `POST {base}/chat/completions` API.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl OpenAiChatClient {
    pub fn new(llm: &LlmConfig, settings: &SummarizationConfig) -> Result<Self, LlmError> {
        if !llm.has_credential() {
            return Err(LlmError::MissingCredential);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", llm.base_url.trim_end_matches('/')),
            api_key: llm.api_key.clone(),
            model: llm.model.clone(),
            timeout_secs: settings.timeout_secs,
            max_retries: settings.max_retries,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = LlmError::Status {
                        status: status.as_u16(),
                        body: body_text,
                    };
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(LlmError::Timeout(self.timeout_secs));
                }
                Err(e) => {
                    last_err = Some(e.into());
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            LlmError::InvalidResponse("request failed after retries".to_string())
        }))
    }
}

/// Extract `choices[0].message.content`, trimmed.
fn parse_chat_response(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))
}
