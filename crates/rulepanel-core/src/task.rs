//! Analysis task: one rule against the input text.
//!
//! A single parameterized task type, run once per rule. The result is always
//! usable: degenerate replies are replaced by the per-task guard.

use rulepanel_llm::TaskExecutor;
use serde::Serialize;
use tracing::debug;

use crate::config::ReviewConfig;
use crate::guard::{repair_task_output, task_stand_in, RepairReason};
use crate::obs;
use crate::prompt::build_rule_prompt;
use crate::rules::{Rule, RuleId};
use crate::sanitize::sanitize_or_keep;
use crate::text::ensure_short;

/// One task's contribution to the review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutput {
    pub rule_id: RuleId,
    /// Findings text; never empty, never a bare failure reply.
    pub text: String,
    pub repaired: bool,
    pub reason: Option<RepairReason>,
    /// Provider calls made for this task.
    pub attempts: u32,
}

impl TaskOutput {
    /// Standard stand-in for a task that produced nothing usable.
    pub fn stand_in(rule_id: RuleId, reason: RepairReason, config: &ReviewConfig) -> Self {
        Self {
            text: task_stand_in(&rule_id, config),
            rule_id,
            repaired: true,
            reason: Some(reason),
            attempts: 0,
        }
    }
}

/// Build the rule prompt, invoke the executor once, cap and repair the reply.
pub async fn run_analysis_task(
    executor: &TaskExecutor,
    rule: &Rule,
    input: &str,
    config: &ReviewConfig,
) -> TaskOutput {
    let prompt = build_rule_prompt(rule, input, config);
    let reply = executor
        .invoke_detailed(&prompt, config.task_max_tokens, config.temperature)
        .await;
    debug!(
        rule_id = %rule.id,
        attempts = reply.attempts,
        reply_chars = reply.content.chars().count(),
        "task reply received"
    );

    let mut content = reply.content.trim().to_string();
    if config.sanitize_task_output && !reply.failed {
        content = sanitize_or_keep(&content);
    }
    let content = ensure_short(&content, config.max_task_output_chars);

    let repaired = repair_task_output(&rule.id, &content, config);
    if let Some(reason) = repaired.reason {
        obs::emit_task_repaired(&rule.id, reason);
    }

    TaskOutput {
        rule_id: rule.id.clone(),
        repaired: repaired.is_repaired(),
        reason: repaired.reason,
        text: repaired.text,
        attempts: reply.attempts,
    }
}
