//! Executor and provider configuration.
//!
//! Values are read once at startup (environment or an injected lookup) and
//! treated as read-only afterwards.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Retry, timeout and stub-mode controls for the [`TaskExecutor`](crate::TaskExecutor).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutorConfig {
    /// Return a deterministic placeholder instead of calling a provider.
    pub stub: bool,
    /// Total attempts per invocation (1 = no retries).
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts (milliseconds).
    pub backoff_base_ms: u64,
    /// Wall-clock budget for a single attempt (milliseconds).
    pub attempt_timeout_ms: u64,
    /// Default output size cap passed to the provider.
    pub max_tokens: u32,
    /// Default sampling temperature.
    pub temperature: f32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            stub: false,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            attempt_timeout_ms: 60_000,
            max_tokens: 1_500,
            temperature: 0.0,
        }
    }
}

impl ExecutorConfig {
    /// Read `USE_STUB`, `LLM_RETRIES`, `LLM_BACKOFF`, `LLM_TIMEOUT_SECS`
    /// and `LLM_MAX_TOKENS` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let stub = lookup("USE_STUB")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.stub);

        let max_attempts = parse_or("LLM_RETRIES", lookup("LLM_RETRIES"), defaults.max_attempts)
            .max(1);

        let backoff_base_ms = match lookup("LLM_BACKOFF") {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(secs) if secs.is_finite() && secs >= 0.0 => (secs * 1_000.0).round() as u64,
                _ => {
                    warn!(key = "LLM_BACKOFF", value = %raw, "ignoring invalid backoff value");
                    defaults.backoff_base_ms
                }
            },
            None => defaults.backoff_base_ms,
        };

        let attempt_timeout_ms = parse_or::<u64>(
            "LLM_TIMEOUT_SECS",
            lookup("LLM_TIMEOUT_SECS"),
            defaults.attempt_timeout_ms / 1_000,
        )
        .saturating_mul(1_000);

        let max_tokens = parse_or("LLM_MAX_TOKENS", lookup("LLM_MAX_TOKENS"), defaults.max_tokens);

        Self {
            stub,
            max_attempts,
            backoff_base_ms,
            attempt_timeout_ms,
            max_tokens,
            temperature: defaults.temperature,
        }
    }

    /// Stub-mode config with no backoff, for tests and offline runs.
    pub fn stubbed() -> Self {
        Self {
            stub: true,
            backoff_base_ms: 0,
            ..Self::default()
        }
    }
}

/// Connection settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Bearer token; `None` leaves the executor without a provider.
    pub api_key: Option<String>,
    /// Model name sent with every request.
    pub model: String,
    /// Endpoint root, without the trailing `/chat/completions`.
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Read `GROQ_API_KEY`, `GROQ_MODEL` and `GROQ_BASE_URL` from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_blank("GROQ_API_KEY"),
            model: non_blank("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: non_blank("GROQ_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key = key, value = %value, "ignoring unparseable config value");
            default
        }),
        None => default,
    }
}
