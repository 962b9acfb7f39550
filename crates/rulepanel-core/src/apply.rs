//! Apply stage: rewrite the input according to the merged report.
//!
//! The rewritten text is opaque; only the provenance header is checked.

use std::sync::LazyLock;

use regex::Regex;
use rulepanel_llm::TaskExecutor;
use serde::Serialize;
use tracing::warn;

use crate::config::ReviewConfig;
use crate::guard::extract_triggers;
use crate::obs;
use crate::prompt::build_apply_prompt;
use crate::rules::RuleId;

/// Returned when there is neither a merged report nor any input.
pub const NO_INPUT_PLACEHOLDER: &str = "No original code provided.";

static APPLIED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\*\s*Applied\s*:\s*([A-Za-z0-9, ]+)\s*\*/").expect("valid regex literal")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedText {
    pub text: String,
    /// The provenance header was added here, not by the model.
    pub header_synthesized: bool,
    /// No merged report was available, so no rewrite was attempted.
    pub skipped: bool,
}

/// `/* Applied: G01,G02 */` followed by a newline.
pub fn provenance_header(rule_ids: &[RuleId]) -> String {
    let ids: Vec<&str> = rule_ids.iter().map(RuleId::as_str).collect();
    format!("/* Applied: {} */\n", ids.join(","))
}

/// Rule ids listed by the first provenance header in `text`.
pub fn parse_provenance_header(text: &str) -> Option<Vec<String>> {
    APPLIED_HEADER.captures(text).and_then(|caps| caps.get(1)).map(|m| {
        m.as_str()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Whether the first non-blank line of `text` opens with a provenance header.
pub fn starts_with_provenance_header(text: &str) -> bool {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| APPLIED_HEADER.find(line.trim_start()))
        .is_some_and(|m| m.start() == 0)
}

/// Apply `merged` to `input` with one executor call.
///
/// Without a merged report the input is echoed verbatim rather than rewritten.
pub async fn run_apply(
    executor: &TaskExecutor,
    merged: Option<&str>,
    input: &str,
    config: &ReviewConfig,
) -> AppliedText {
    let merged = match merged {
        Some(m) if !m.trim().is_empty() => m,
        _ => {
            let text = if input.is_empty() {
                NO_INPUT_PLACEHOLDER.to_string()
            } else {
                input.to_string()
            };
            obs::emit_apply_completed(text.chars().count(), false, true);
            return AppliedText {
                text,
                header_synthesized: false,
                skipped: true,
            };
        }
    };

    let prompt = build_apply_prompt(merged, input, config);
    let reply = executor
        .invoke_detailed(&prompt, config.apply_max_tokens, config.temperature)
        .await;
    if reply.failed {
        warn!(attempts = reply.attempts, "apply call failed");
    }

    let mut text = reply.content;
    let mut header_synthesized = false;
    if !starts_with_provenance_header(&text) {
        let triggers = extract_triggers(merged);
        if !triggers.is_empty() {
            text = provenance_header(&triggers) + &text;
            header_synthesized = true;
        }
    }

    obs::emit_apply_completed(text.chars().count(), header_synthesized, false);
    AppliedText {
        text,
        header_synthesized,
        skipped: false,
    }
}
