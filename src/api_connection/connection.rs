use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::endpoints::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// Everything that can go wrong talking to the completion service. Every
/// variant means the in-flight request produced no usable text.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("completion API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    #[error("could not decode completion response: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("completion response contained no choices")]
    NoChoices,
    #[error("completion response contained no text")]
    EmptyContent,
}

const QUOTE_CHARS: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Removes surrounding whitespace and any number of wrapping quotation
/// characters, so `"\"Tuscan Bean Stew\""` becomes `Tuscan Bean Stew`.
/// A full stop after the closing quote goes with it. Quotes inside the
/// text are left alone.
pub fn strip_wrapping_quotes(text: &str) -> &str {
    let mut current = text.trim();
    loop {
        let candidate = current.strip_suffix('.').map(str::trim_end).unwrap_or(current);
        let mut chars = candidate.chars();
        match (chars.next(), chars.next_back()) {
            (Some(first), Some(last)) if QUOTE_CHARS.contains(&first) && QUOTE_CHARS.contains(&last) => {
                current = chars.as_str().trim();
            }
            _ => return current,
        }
    }
}

/// The single seam through which prompts leave the process.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// One request/response exchange; returns the first choice's text.
    async fn complete(&self, system_role: &str, user_prompt: &str) -> Result<String, CompletionError>;

    /// Like [`complete`](Self::complete), for short suggestion answers: the
    /// wrapping quotes the suggestion prompt asks for are stripped.
    async fn suggest(&self, system_role: &str, user_prompt: &str) -> Result<String, CompletionError> {
        let raw = self.complete(system_role, user_prompt).await?;
        let value = strip_wrapping_quotes(&raw);
        if value.is_empty() {
            return Err(CompletionError::EmptyContent);
        }
        Ok(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub site_url: String,
    pub app_name: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub request_timeout: Duration,
}

/// OpenAI-compatible chat completion client (OpenRouter by default).
pub struct CompletionGateway {
    client: Client,
    settings: GatewaySettings,
}

impl CompletionGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, CompletionError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub async fn call_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CompletionError> {
        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(&self.settings.api_key)
            .header("HTTP-Referer", &self.settings.site_url)
            .header("X-Title", &self.settings.app_name)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(CompletionError::ApiError { status, error_body });
        }

        // Decode from text so a malformed body reports as a serde error
        // rather than an opaque transport error.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CompletionService for CompletionGateway {
    async fn complete(&self, system_role: &str, user_prompt: &str) -> Result<String, CompletionError> {
        let request = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::system(system_role), ChatMessage::user(user_prompt)],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        debug!(model = %request.model, prompt_len = user_prompt.len(), "sending completion request");

        let response = self.call_chat_completion(&request).await.map_err(|e| {
            warn!(error = %e, "completion request failed");
            e
        })?;

        if response.choices.is_empty() {
            return Err(CompletionError::NoChoices);
        }
        match response.first_text() {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(CompletionError::EmptyContent),
        }
    }
}
