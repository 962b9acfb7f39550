//! OpenAI-compatible chat-completions provider (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::LlmError;
use crate::provider::{GenerationRequest, TextGenerator};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl ChatCompletionsProvider {
    /// Build a provider from `config`.
    ///
    /// `request_timeout` is a transport-level ceiling; the executor applies
    /// its own per-attempt timeout on top.
    pub fn from_config(
        config: &ProviderConfig,
        request_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::NotConfigured("GROQ_API_KEY is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("rulepanel-llm/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsProvider {
    fn name(&self) -> &str {
        "chat-completions"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value, LlmError> {
        debug!(model = %self.model, prompt_chars = request.prompt.len(), "sending chat completion");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: &request.prompt,
                }],
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
