//! Error types for rulepanel-llm

use thiserror::Error;

/// Errors that can occur while talking to a text-generation provider.
///
/// None of these cross the [`TaskExecutor`](crate::TaskExecutor) boundary:
/// the executor retries them and converts exhaustion into a failure reply.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Provider credentials are missing
    #[error("LLM provider is not configured: {0}")]
    NotConfigured(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A single attempt exceeded its time budget
    #[error("attempt timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Response body could not be decoded
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific failure reported by an adapter
    #[error("provider error: {0}")]
    Provider(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Http(format!("request timed out: {err}"))
        } else {
            LlmError::Http(err.to_string())
        }
    }
}
