//! rulepanel-llm: the text-generation boundary
//!
//! Everything the review pipeline knows about language models goes through
//! [`TaskExecutor`]: one prompt in, plain text out, with retries, backoff and
//! a stub mode for offline runs.
//!
//! ## Layer 0 - Provider/Transport
//!
//! Focus: totality. `invoke` always returns a `String`, never an error.

mod error;

pub mod config;
pub mod executor;
pub mod http;
pub mod normalize;
pub mod provider;
pub mod stub;

pub use config::{ExecutorConfig, ProviderConfig};
pub use error::LlmError;
pub use executor::{is_failure_reply, InvokeReport, TaskExecutor, FAILURE_SENTINEL};
pub use http::ChatCompletionsProvider;
pub use normalize::{extract_text, normalize_reply};
pub use provider::{GenerationRequest, TextGenerator};
pub use stub::{stub_reply, StubGenerator, STUB_PREFIX};

/// Result type for rulepanel-llm operations
pub type Result<T> = std::result::Result<T, LlmError>;
