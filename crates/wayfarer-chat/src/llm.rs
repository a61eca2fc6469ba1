//! Language model client trait and implementations.
//!
//! - `OpenRouterClient` calls an OpenAI-compatible `/chat/completions`
//!   endpoint. It is constructed once at startup and shared behind an `Arc`.
//! - `MockLanguageModel` replays scripted completions and records every
//!   request it receives, for testing the orchestrator without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wayfarer_core::config::LlmConfig;

use crate::error::ChatError;

/// Speaker of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything needed for one completion call.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to constrain output to a single JSON object.
    pub json_mode: bool,
}

/// Why the model stopped generating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// The output token budget ran out mid-generation.
    Length,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("stop") | None => FinishReason::Stop,
            Some("length") | Some("max_tokens") => FinishReason::Length,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

/// Raw model output.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub content: String,
    pub finish_reason: FinishReason,
}

impl Completion {
    pub fn is_truncated(&self) -> bool {
        self.finish_reason == FinishReason::Length
    }
}

/// A chat-completion language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ChatError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// OpenRouterClient
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenRouter and other OpenAI-compatible chat APIs.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenRouterClient {
    /// Build a client from configuration, reading the API key from the environment.
    ///
    /// A missing key is logged and reported on each call instead of failing here.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!(env = %config.api_key_env, "Language model API key not set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::ConfigError(format!("HTTP client: {}", e)))?;

        info!(model = %config.model, base_url = %config.base_url, "Language model client ready");
        Ok(Self::new(client, config, api_key))
    }

    pub fn new(client: reqwest::Client, config: &LlmConfig, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::LlmError("API key is not configured".to_string()))?;

        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::LlmError(format!("HTTP error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let reason = match status {
                reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                    "authentication failed"
                }
                reqwest::StatusCode::TOO_MANY_REQUESTS => "rate limited",
                _ => "request failed",
            };
            return Err(ChatError::LlmError(format!("{} ({}): {}", reason, status, text)));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::LlmError(format!("invalid response body: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::LlmError("response contained no choices".to_string()))?;

        let completion = Completion {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
        };
        debug!(
            chars = completion.content.len(),
            finish_reason = ?completion.finish_reason,
            "Completion received"
        );
        Ok(completion)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// MockLanguageModel
// ---------------------------------------------------------------------------

/// Scripted language model for tests and offline runs.
///
/// Each call pops the next scripted outcome; an empty script is an error.
#[derive(Debug, Default)]
pub struct MockLanguageModel {
    script: Mutex<VecDeque<Result<Completion, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a normally finished completion.
    pub fn push_reply(&self, content: impl Into<String>) -> &Self {
        self.push(Ok(Completion {
            content: content.into(),
            finish_reason: FinishReason::Stop,
        }))
    }

    /// Queue a completion cut off by the token limit.
    pub fn push_truncated(&self, content: impl Into<String>) -> &Self {
        self.push(Ok(Completion {
            content: content.into(),
            finish_reason: FinishReason::Length,
        }))
    }

    /// Queue a failed invocation.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.push(Err(message.into()))
    }

    fn push(&self, outcome: Result<Completion, String>) -> &Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ChatError> {
        self.requests
            .lock()
            .map_err(|e| ChatError::LlmError(format!("mock lock poisoned: {}", e)))?
            .push(request);
        let next = self
            .script
            .lock()
            .map_err(|e| ChatError::LlmError(format!("mock lock poisoned: {}", e)))?
            .pop_front();
        match next {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(message)) => Err(ChatError::LlmError(message)),
            None => Err(ChatError::LlmError("no scripted response".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
