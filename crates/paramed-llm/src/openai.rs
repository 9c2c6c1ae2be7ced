use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::http::{DEFAULT_REQUEST_TIMEOUT, client_with_timeout};
use crate::provider::{LlmProvider, Message};

const PROVIDER: &str = "openai";
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(1);

/// Model and sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            max_tokens: 4000,
            temperature: 0.3,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Client for any endpoint speaking the OpenAI `chat/completions` protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    settings: CompletionSettings,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.settings.model)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>, settings: CompletionSettings) -> Self {
        let endpoint = format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        );
        Self {
            client: client_with_timeout(settings.timeout),
            api_key: api_key.into(),
            endpoint,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    fn request_body<'a>(&'a self, messages: &'a [Message], json_mode: bool) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.settings.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            response_format: json_mode.then_some(ResponseFormat { r#type: "json_object" }),
        }
    }

    async fn complete_once(&self, body: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        let raw = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %raw, "completion request rejected");
            return Err(LlmError::Api {
                status: status.as_u16(),
            });
        }

        let completion: CompletionResponse = serde_json::from_str(&raw)?;
        if let Some(usage) = &completion.usage {
            tracing::debug!(
                model = %self.settings.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }
        completion.into_content()
    }

    /// One retry, after a fixed pause, when the endpoint answers 429.
    async fn complete(&self, messages: &[Message], json_mode: bool) -> Result<String, LlmError> {
        let body = self.request_body(messages, json_mode);
        match self.complete_once(&body).await {
            Err(LlmError::RateLimited) => {
                tracing::warn!(backoff_ms = RATE_LIMIT_BACKOFF.as_millis(), "rate limited");
                tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
                self.complete_once(&body).await
            }
            result => result,
        }
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.complete(messages, false).await
    }

    async fn chat_json(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.complete(messages, true).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

impl CompletionResponse {
    fn into_content(self) -> Result<String, LlmError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse { provider: PROVIDER })
    }
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TokenUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
