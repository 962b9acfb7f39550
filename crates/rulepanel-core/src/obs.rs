//! Structured lifecycle events for a review.
//!
//! - `ReviewSpan` RAII guard tagging everything inside a review with its id
//! - `emit_*` functions, one per lifecycle event
//!
//! Events are `info!` except quality degradations, which are `warn!`.

use tracing::{info, warn};

use crate::guard::RepairReason;
use crate::rules::RuleId;

/// Span carrying `review_id`, for `Instrument`ing async review work.
pub fn review_span(review_id: &str) -> tracing::Span {
    tracing::info_span!("rulepanel.review", review_id = %review_id)
}

/// RAII guard that enters a review-scoped span on the current thread.
///
/// ```ignore
/// let _span = ReviewSpan::enter("3f2a...");
/// // events now carry review_id = "3f2a..."
/// ```
pub struct ReviewSpan {
    _span: tracing::span::EnteredSpan,
}

impl ReviewSpan {
    pub fn enter(review_id: &str) -> Self {
        Self {
            _span: review_span(review_id).entered(),
        }
    }
}

pub fn emit_review_started(review_id: &str, rules: usize, input_chars: usize, provider: &str) {
    info!(
        event = "review.started",
        review_id = %review_id,
        rules = rules,
        input_chars = input_chars,
        provider = %provider,
    );
}

/// A task reply was replaced by a stand-in.
pub fn emit_task_repaired(rule_id: &RuleId, reason: RepairReason) {
    warn!(event = "task.repaired", rule_id = %rule_id, reason = reason.as_str());
}

pub fn emit_fan_out_completed(tasks: usize, repaired: usize, duration_ms: u64) {
    info!(
        event = "fan_out.completed",
        tasks = tasks,
        repaired = repaired,
        duration_ms = duration_ms,
    );
}

pub fn emit_merge_completed(report_chars: usize, synthesized: &[RuleId]) {
    if synthesized.is_empty() {
        info!(event = "merge.completed", report_chars = report_chars, synthesized = 0);
    } else {
        let ids: Vec<&str> = synthesized.iter().map(RuleId::as_str).collect();
        warn!(
            event = "merge.completed",
            report_chars = report_chars,
            synthesized = synthesized.len(),
            synthesized_rules = %ids.join(","),
        );
    }
}

pub fn emit_apply_completed(output_chars: usize, header_synthesized: bool, skipped: bool) {
    info!(
        event = "apply.completed",
        output_chars = output_chars,
        header_synthesized = header_synthesized,
        skipped = skipped,
    );
}

pub fn emit_review_finished(review_id: &str, duration_ms: u64, repaired_tasks: usize) {
    info!(
        event = "review.finished",
        review_id = %review_id,
        duration_ms = duration_ms,
        repaired_tasks = repaired_tasks,
    );
}

/// The whole review was aborted.
pub fn emit_review_aborted(review_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "review.aborted", review_id = %review_id, error = %error);
}
