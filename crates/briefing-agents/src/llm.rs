//! Chat-completion client for the judge and the refiner.
//!
//! The transport is an OpenAI-compatible `/chat/completions` endpoint; the
//! model, base URL, and temperature come from [`LlmEndpoint`]. Callers depend
//! on the [`ChatCompletion`] trait so tests can script replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmEndpoint;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed completion payload: {0}")]
    Decode(String),

    #[error("empty completion")]
    Empty,
}

/// One chat-completion call: system prompt + user prompt in, free text out.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Production client against an OpenAI-compatible endpoint.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    endpoint: LlmEndpoint,
}

impl OpenAiChatClient {
    pub fn new(endpoint: LlmEndpoint, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl ChatCompletion for OpenAiChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.endpoint.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.endpoint.temperature,
        };

        let url = format!("{}/chat/completions", self.endpoint.url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.endpoint.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status));
        }

        let raw = response.text().await?;
        let body: ChatResponse =
            serde_json::from_str(&raw).map_err(|e| LlmError::Decode(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::Empty)
    }
}
