//! Prompt builders for the three stages.
//!
//! Each builder truncates the source text itself, so callers pass the raw
//! input and the caps in [`ReviewConfig`] always apply.

use crate::config::ReviewConfig;
use crate::rules::{Rule, RuleSet};
use crate::text::truncate_input;

/// Prompt asking for up to `max_findings` findings against one rule.
pub fn build_rule_prompt(rule: &Rule, code: &str, config: &ReviewConfig) -> String {
    let code = truncate_input(code, config.max_input_chars);
    let mandatory = if config.require_every_rule {
        "If no issues, still propose ONE minimal best-practice change for this rule.\n"
    } else {
        ""
    };
    let fence = &config.code_fence;
    format!(
        "RULE:{id} | {title}\n{description}\n\n\
         You are a senior {language} reviewer. Provide up to {max} concise findings. {mandatory}\
         FOR EACH finding use THIS TEMPLATE (plain text only):\n\
         - Finding: <short title>\n\
         - Area: <method name or 'approximate'>\n\
         - Severity: <High|Medium|Low>\n\
         - Confidence: <1-5>\n\
         - Issue: <one short sentence>\n\
         - Fix: <one short sentence>\n\
         - Patch (optional): ```{fence}\n  // minimal snippet\n  ```\n\n\
         RULES: Do NOT invent line numbers. Use 'approximate' when unsure. \
         Respond ONLY with findings (no commentary).\n\n\
         CODE:\n{code}\n",
        id = rule.id,
        title = rule.title,
        description = rule.description,
        language = config.language,
        max = config.max_findings,
    )
}

/// Integrator prompt over the labelled task outputs.
pub fn build_merge_prompt(findings: &str, rules: &RuleSet, config: &ReviewConfig) -> String {
    let ids: Vec<String> = rules.ids().map(ToString::to_string).collect();
    let span = match (ids.first(), ids.last()) {
        (Some(first), Some(last)) if first != last => format!("{first} to {last}"),
        (Some(only), _) => only.clone(),
        _ => String::new(),
    };
    let fence = &config.code_fence;
    format!(
        "You are a strict integrator. Given the reviewers' findings below, produce a FINAL prioritized list\n\
         with exactly one consolidated suggestion for each rule from {span} (put the rule id in the Trigger field).\n\
         Use THIS TEMPLATE for every suggestion (plain text only):\n\n\
         - Title: <short>\n\
         - Trigger: <rule id>\n\
         - Area: <method or 'approximate'>\n\
         - Severity: <High|Medium|Low>\n\
         - Rationale: <one short sentence>\n\
         - Change: <one-line action>\n\
         - Patch (optional): ```{fence}\n  // minimal snippet\n  ```\n\n\
         RULES:\n\
         1) MUST output one consolidated suggestion for each of: {list}. \
         If a reviewer said the code is fine for its rule, still produce a minimal best-practice change.\n\
         2) Prioritize correctness/security (High) first when ordering. \
         3) If reviewers conflict, pick the least-risky correct fix. \
         4) At the end produce a 'Minimal Patch' of 3-12 concrete edit lines.\n\n\
         AGENT_FINDINGS:\n{findings}\n\n\
         Respond ONLY with the consolidated suggestions and the Minimal Patch.",
        list = ids.join(", "),
    )
}

/// Transform prompt applying the merged report to the source text.
pub fn build_apply_prompt(merged: &str, code: &str, config: &ReviewConfig) -> String {
    let code = truncate_input(code, config.max_input_chars);
    format!(
        "Task: Apply ALL changes listed in MERGED_SUGGESTIONS to ORIGINAL_CODE. You MUST apply each rule's fix.\n\
         Return ONLY a single updated {language} file (no commentary). At the very top include a one-line comment:\n\
         /* Applied: <comma-separated rule ids> */\n\n\
         Rules: 1) Make minimal safe edits that implement the suggested changes. 2) Preserve unrelated code. \
         3) When ambiguous choose the smallest safe change that accomplishes the fix.\n\n\
         MERGED_SUGGESTIONS:\n{merged}\n\n\
         ORIGINAL_CODE:\n{code}\n\n\
         Respond only with the updated file.",
        language = config.language,
    )
}
