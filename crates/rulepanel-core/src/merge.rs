//! Merge stage: one integrator call over all task outputs.

use rulepanel_llm::TaskExecutor;
use serde::Serialize;
use tracing::warn;

use crate::config::ReviewConfig;
use crate::guard::{complete_report, missing_slot_stand_in, noop_stand_in};
use crate::obs;
use crate::prompt::build_merge_prompt;
use crate::rules::{RuleId, RuleSet};
use crate::state::TaskOutputs;
use crate::text::ensure_short;

/// Verbatim reviewer reply meaning "nothing to report".
pub const NOOP_ACK: &str = "code is fine for that guideline";

/// Consolidated report after the post-merge guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedReport {
    /// Names every rule through a `Trigger: <id>` marker.
    pub text: String,
    /// Rules the integrator left out, filled by the guard.
    pub synthesized: Vec<RuleId>,
    /// The integrator call itself failed.
    pub provider_failed: bool,
}

/// Label each task output `RULE <id>:` in ascending rule order.
///
/// Missing, empty and no-op slots are replaced by stand-ins, so every rule
/// contributes one block.
pub fn assemble_merge_input(outputs: &TaskOutputs, rules: &RuleSet) -> String {
    rules
        .ids()
        .map(|id| {
            let body = match outputs.get(id).map(|o| o.text.trim()) {
                None | Some("") => missing_slot_stand_in(id),
                Some(NOOP_ACK) => noop_stand_in(id),
                Some(text) => format!("{text}\n"),
            };
            format!("RULE {id}:\n{body}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Invoke the integrator once, cap the reply, then append whatever rules it missed.
pub async fn run_merge(
    executor: &TaskExecutor,
    outputs: &TaskOutputs,
    rules: &RuleSet,
    config: &ReviewConfig,
) -> MergedReport {
    let findings = assemble_merge_input(outputs, rules);
    let prompt = build_merge_prompt(&findings, rules, config);
    let reply = executor
        .invoke_detailed(&prompt, config.merge_max_tokens, config.temperature)
        .await;
    if reply.failed {
        warn!(attempts = reply.attempts, "merge call failed; report will be synthesized");
    }

    let capped = ensure_short(&reply.content, config.max_merge_output_chars);
    let guarded = complete_report(&capped, rules, config);
    obs::emit_merge_completed(guarded.text.chars().count(), &guarded.appended);

    MergedReport {
        text: guarded.text,
        synthesized: guarded.appended,
        provider_failed: reply.failed,
    }
}
