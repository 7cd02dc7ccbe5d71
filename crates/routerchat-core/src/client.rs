use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::state::ChatMessage;

/// Assistant text used when the endpoint answers successfully but offers no
/// usable completion candidate.
pub const NO_VALID_RESPONSE: &str = "No valid response from API.";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

/// Outcome of one completion request. Every variant renders to exactly one
/// assistant message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// First candidate's content.
    Reply(String),
    /// Success status, but no usable candidate in the body.
    NoCandidate,
    /// Transport failure or non-2xx status.
    Failed(String),
}

impl Completion {
    pub fn is_failure(&self) -> bool {
        matches!(self, Completion::Failed(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Completion::Reply(text) => text,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Reply(text) => f.write_str(text),
            Completion::NoCandidate => f.write_str(NO_VALID_RESPONSE),
            Completion::Failed(description) => write!(f, "Error: {}", description),
        }
    }
}

/// Anything that can turn a conversation history into the next assistant reply.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, history: &[ChatMessage]) -> Completion;
}

/// Client for OpenAI-compatible chat completion endpoints (OpenRouter, DeepSeek, ...).
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        // Default TLS backend, certificate validation stays on.
        let client = Client::builder()
            .user_agent(concat!("routerchat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, history: &[ChatMessage]) -> reqwest::Result<serde_json::Value> {
        let request = CompletionRequest {
            model: &self.model,
            messages: history,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        response.json().await
    }
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(&self, history: &[ChatMessage]) -> Completion {
        debug!(model = %self.model, messages = history.len(), "sending completion request");

        let body = match self.send(history).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "completion request failed");
                return Completion::Failed(e.to_string());
            }
        };

        match first_candidate(body) {
            Some(text) => Completion::Reply(text),
            None => {
                warn!("completion response contained no usable candidate");
                Completion::NoCandidate
            }
        }
    }
}

/// Content of the first choice, if the body has the expected shape.
fn first_candidate(body: serde_json::Value) -> Option<String> {
    let response: CompletionResponse = serde_json::from_value(body).ok()?;
    response.choices.into_iter().next().map(|c| c.message.content)
}
