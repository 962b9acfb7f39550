//! Retrying task executor: the only way the pipeline talks to a provider.
//!
//! [`TaskExecutor::invoke`] never returns an error. Transient failures are
//! retried with exponential backoff; exhaustion becomes a reply starting with
//! [`FAILURE_SENTINEL`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{ExecutorConfig, ProviderConfig};
use crate::error::LlmError;
use crate::http::ChatCompletionsProvider;
use crate::normalize::normalize_reply;
use crate::provider::{GenerationRequest, TextGenerator};
use crate::stub::stub_reply;

/// Prefix of every failure reply produced by the executor.
pub const FAILURE_SENTINEL: &str = "[llm-invoke-failed]";

/// `true` if `text` is a failure reply (case-insensitive, leading whitespace ignored).
pub fn is_failure_reply(text: &str) -> bool {
    text.trim_start()
        .get(..FAILURE_SENTINEL.len())
        .map(|head| head.eq_ignore_ascii_case(FAILURE_SENTINEL))
        .unwrap_or(false)
}

/// Outcome of one [`TaskExecutor::invoke_detailed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeReport {
    /// Normalized reply, or a failure reply.
    pub content: String,
    /// Provider calls made (0 in stub mode or without a provider).
    pub attempts: u32,
    /// Whether `content` is a failure reply.
    pub failed: bool,
}

pub struct TaskExecutor {
    config: ExecutorConfig,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("config", &self.config)
            .field("generator", &self.generator.as_ref().map(|g| g.name()))
            .finish()
    }
}

impl TaskExecutor {
    pub fn new(config: ExecutorConfig, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { config, generator }
    }

    /// Executor in stub mode with no provider.
    pub fn stub() -> Self {
        Self::new(ExecutorConfig::stubbed(), None)
    }

    /// Build from environment configuration.
    ///
    /// A missing API key is not an error here: the executor is created
    /// without a provider and every call returns a failure reply.
    pub fn from_env() -> Self {
        Self::from_configs(ExecutorConfig::from_env(), &ProviderConfig::from_env())
    }

    pub fn from_configs(config: ExecutorConfig, provider: &ProviderConfig) -> Self {
        if config.stub {
            return Self::new(config, None);
        }
        let transport_timeout = Duration::from_millis(config.attempt_timeout_ms.saturating_add(5_000));
        let generator = match ChatCompletionsProvider::from_config(provider, transport_timeout) {
            Ok(p) => Some(Arc::new(p) as Arc<dyn TextGenerator>),
            Err(e) => {
                warn!(error = %e, "LLM provider unavailable; set USE_STUB=true or GROQ_API_KEY");
                None
            }
        };
        Self::new(config, generator)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Name of the active provider, `"stub"` in stub mode, `"none"` otherwise.
    pub fn provider_name(&self) -> &str {
        if self.config.stub {
            "stub"
        } else {
            self.generator.as_ref().map(|g| g.name()).unwrap_or("none")
        }
    }

    /// Send `prompt` and return plain text. Never fails.
    pub async fn invoke(&self, prompt: &str, max_tokens: u32, temperature: f32) -> String {
        self.invoke_detailed(prompt, max_tokens, temperature)
            .await
            .content
    }

    /// [`invoke`](Self::invoke) with attempt accounting.
    pub async fn invoke_detailed(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> InvokeReport {
        if self.config.stub {
            return InvokeReport {
                content: stub_reply(prompt),
                attempts: 0,
                failed: false,
            };
        }

        let Some(generator) = self.generator.as_ref() else {
            return InvokeReport {
                content: format!(
                    "{FAILURE_SENTINEL} LLM client not initialized. \
                     Set USE_STUB=true or configure GROQ_API_KEY/GROQ_MODEL."
                ),
                attempts: 0,
                failed: true,
            };
        };

        let request = GenerationRequest::new(prompt, max_tokens, temperature);
        let max_attempts = self.config.max_attempts.max(1);
        let timeout = Duration::from_millis(self.config.attempt_timeout_ms);
        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=max_attempts {
            // Dropping the timed-out future cancels the in-flight request.
            let result = tokio::time::timeout(timeout, generator.generate(&request)).await;

            let err = match result {
                Ok(Ok(value)) => {
                    debug!(provider = generator.name(), attempt, "invoke succeeded");
                    return InvokeReport {
                        content: normalize_reply(&value),
                        attempts: attempt,
                        failed: false,
                    };
                }
                Ok(Err(e)) => e,
                Err(_elapsed) => LlmError::Timeout {
                    timeout_ms: self.config.attempt_timeout_ms,
                },
            };

            warn!(
                provider = generator.name(),
                attempt,
                max_attempts,
                error = %err,
                "invoke attempt failed"
            );
            last_error = Some(err);

            if attempt < max_attempts {
                tokio::time::sleep(self.backoff_delay(attempt)).await;
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        InvokeReport {
            content: format!("{FAILURE_SENTINEL} All retries failed. Last error: {last}"),
            attempts: max_attempts,
            failed: true,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.config.backoff_base_ms.saturating_mul(factor))
    }
}
