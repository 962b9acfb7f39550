//! Review configuration.
//!
//! Size caps, concurrency limits and per-stage generation parameters. Every
//! field has a default, so a TOML file only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Language named in prompts ("senior Java reviewer").
    pub language: String,
    /// Info string used for patch code fences.
    pub code_fence: String,
    /// Input text cap, in characters, before prompting.
    pub max_input_chars: usize,
    /// Per-task reply cap, in characters.
    pub max_task_output_chars: usize,
    /// Merged report cap, in characters, applied before the completeness guard.
    pub max_merge_output_chars: usize,
    /// Upper bound on findings requested per rule.
    pub max_findings: usize,
    /// Ask every rule for at least one best-practice change.
    pub require_every_rule: bool,
    /// Strip non-template lines from task replies before repair.
    pub sanitize_task_output: bool,
    /// Maximum analysis tasks in flight at once.
    pub max_concurrent_tasks: usize,
    /// Wall-clock ceiling for the whole fan-out phase.
    pub fan_out_timeout_ms: u64,
    /// Optional ceiling for the whole review; exceeding it aborts the request.
    pub review_timeout_ms: Option<u64>,
    pub task_max_tokens: u32,
    pub merge_max_tokens: u32,
    pub apply_max_tokens: u32,
    pub temperature: f32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            language: "Java".to_string(),
            code_fence: "java".to_string(),
            max_input_chars: 24_000,
            max_task_output_chars: 5_000,
            max_merge_output_chars: 30_000,
            max_findings: 4,
            require_every_rule: true,
            sanitize_task_output: false,
            max_concurrent_tasks: 10,
            fan_out_timeout_ms: 180_000,
            review_timeout_ms: None,
            task_max_tokens: 1_500,
            merge_max_tokens: 1_500,
            apply_max_tokens: 1_500,
            temperature: 0.0,
        }
    }
}

impl ReviewConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        Ok(config)
    }
}
