//! Error taxonomy for the review pipeline.
//!
//! Per-task and per-stage failures never show up here: they are repaired
//! into valid data where they happen. What remains is configuration problems
//! and failures of the orchestration plumbing itself.

use crate::rules::RuleId;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("invalid rule set: {0}")]
    InvalidRuleSet(String),

    #[error("invalid rule id: {0:?}")]
    InvalidRuleId(String),

    #[error("slot for rule {0} is already filled")]
    SlotTaken(RuleId),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("review timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Result type for review operations.
pub type Result<T> = std::result::Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_taken_message_names_rule() {
        let err = ReviewError::SlotTaken("G03".parse().unwrap());
        assert_eq!(err.to_string(), "slot for rule G03 is already filled");
    }

    #[test]
    fn test_timed_out_message() {
        let err = ReviewError::TimedOut { timeout_ms: 1500 };
        assert!(err.to_string().contains("1500ms"));
    }
}
