use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::config::ClientConfig;

pub type SharedLlmClient = Arc<dyn LlmClient>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of one chat-completion call: a model and a single user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    pub fn user(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.into(),
            }],
        }
    }
}

/// Outcome of a completion after text extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// `choices[0].message.content`
    Text(String),
    /// `choices[0].text`, or the whole response rendered as a string.
    Degraded(String),
    Failed(String),
}

impl Completion {
    /// Text for display; `None` means no answer is available.
    pub fn into_text(self) -> Option<String> {
        match self {
            Completion::Text(text) | Completion::Degraded(text) => Some(text),
            Completion::Failed(_) => None,
        }
    }

    pub fn from_response(raw: &Value) -> Self {
        let choice = raw.get("choices").and_then(|choices| choices.get(0));

        if let Some(content) = choice
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(Value::as_str)
        {
            return Completion::Text(content.to_string());
        }

        if let Some(text) = choice
            .and_then(|choice| choice.get("text"))
            .and_then(Value::as_str)
        {
            return Completion::Degraded(text.to_string());
        }

        Completion::Degraded(raw.to_string())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one chat-completion request and return the raw JSON response.
    async fn chat(&self, request: &CompletionRequest) -> anyhow::Result<Value>;
}

/// Issue a single-message completion. Errors are folded into
/// [`Completion::Failed`] so one failing agent cannot abort its caller.
#[instrument(level = "debug", skip_all, fields(model = %model))]
pub async fn complete(client: &dyn LlmClient, model: &str, prompt: &str) -> Completion {
    let request = CompletionRequest::user(model, prompt);
    match client.chat(&request).await {
        Ok(raw) => Completion::from_response(&raw),
        Err(err) => Completion::Failed(format!("{err:#}")),
    }
}

/// Offline stand-in that answers with the prompt it received.
#[derive(Debug, Default, Clone)]
pub struct EchoLlmClient;

#[async_trait]
impl LlmClient for EchoLlmClient {
    async fn chat(&self, request: &CompletionRequest) -> anyhow::Result<Value> {
        let prompt = request
            .messages
            .last()
            .map(|message| message.content.trim())
            .unwrap_or_default();

        Ok(json!({
            "model": request.model,
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": format!("[offline response]\nI received:\n{prompt}"),
                }
            }]
        }))
    }
}

impl EchoLlmClient {
    pub fn shared() -> SharedLlmClient {
        Arc::new(Self)
    }
}

/// OpenAI-compatible chat client; points at OpenRouter unless overridden.
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl OpenRouterClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self { http, config })
    }

    pub fn shared(config: ClientConfig) -> anyhow::Result<SharedLlmClient> {
        Ok(Arc::new(Self::new(config)?))
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat(&self, request: &CompletionRequest) -> anyhow::Result<Value> {
        let url = self.endpoint();
        debug!(%url, model = %request.model, "Sending chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.api_key.expose())
            .json(request)
            .send()
            .await
            .context("Chat completion request failed")?;

        let response = response
            .error_for_status()
            .context("Chat completion returned error status")?;

        response
            .json::<Value>()
            .await
            .context("Failed to deserialize chat completion response")
    }
}

/// Build the HTTP client from the environment, or the echo client when offline.
pub fn build_llm_client_from_env(offline: bool) -> anyhow::Result<SharedLlmClient> {
    if offline {
        tracing::warn!("Offline mode: using EchoLlmClient");
        return Ok(EchoLlmClient::shared());
    }

    let config = ClientConfig::from_env()?;
    OpenRouterClient::shared(config)
}
