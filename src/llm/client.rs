use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// One message in the chat-completion wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single completion request, decoupled from any provider SDK.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    /// Ask the provider for strict-JSON output
    pub json_mode: bool,
}

/// Transport seam for the generative tier. Implemented by the real HTTP
/// client and by scripted backends in tests.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Returns the assistant message content of the first choice.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct CompletionPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

struct AttemptError {
    error: AppError,
    transient: bool,
}

/// OpenAI-compatible chat-completion client
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl LlmClient {
    /// Create a client with the configured per-call deadline.
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            // At most one extra attempt is honored
            max_retries: config.max_retries.min(1),
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    /// Read the API key from the configured environment variable.
    /// Returns `Ok(None)` when the variable is unset or blank, which
    /// disables the generative tier for the whole process lifetime.
    pub fn from_env(config: &LlmConfig) -> Result<Option<Self>> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(config, key)?)),
            _ => Ok(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn attempt(&self, request: &ChatRequest) -> std::result::Result<String, AttemptError> {
        let payload = CompletionPayload {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then(|| ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let transient = e.is_timeout() || e.is_connect();
                let error = if e.is_timeout() {
                    AppError::RemoteCall(format!("Chat completion timed out: {}", e))
                } else if e.is_connect() {
                    AppError::RemoteCall(format!("Failed to connect to completion API: {}", e))
                } else {
                    AppError::RemoteCall(format!("Chat completion request failed: {}", e))
                };
                AttemptError { error, transient }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError {
                error: AppError::RemoteCall(format!(
                    "Chat completion returned status {}",
                    status
                )),
                transient: status.as_u16() == 429 || status.is_server_error(),
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| AttemptError {
            error: AppError::RemoteCall(format!("Malformed completion payload: {}", e)),
            transient: false,
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AttemptError {
                error: AppError::RemoteCall("Completion carried no content".to_string()),
                transient: false,
            })
    }
}

#[async_trait]
impl ChatApi for LlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.attempt(request).await {
                Ok(content) => return Ok(content),
                Err(AttemptError { error, transient }) => {
                    if !transient || attempts > self.max_retries {
                        return Err(error);
                    }
                    let jitter = rand::thread_rng().gen_range(0..250u64);
                    let backoff = Duration::from_millis(self.retry_backoff_ms + jitter);
                    warn!(
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Transient chat completion failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
