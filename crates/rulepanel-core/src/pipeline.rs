//! Caller boundary: input text in, merged report and rewritten text out.
//!
//! ```text
//! input ─┬─ task(G01) ─┐
//!        ├─ task(G02) ─┤
//!        ┆             ├─ merge ─ guard ─ apply ─ final text
//!        └─ task(Gnn) ─┘
//! ```
//!
//! The core never touches files. Per-task and per-stage failures become
//! degraded-but-valid data; only orchestration failures (or an exceeded
//! `review_timeout_ms`) reach the caller as errors.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rulepanel_llm::TaskExecutor;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::Instrument;

use crate::apply::run_apply;
use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError};
use crate::guard::RepairReason;
use crate::merge::run_merge;
use crate::obs::{self, ReviewSpan};
use crate::rules::{RuleId, RuleSet};
use crate::scheduler::run_fan_out;
use crate::state::ReviewState;
use crate::task::run_analysis_task;

/// Per-rule line of a [`ReviewReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub rule_id: RuleId,
    pub repaired: bool,
    pub reason: Option<RepairReason>,
    pub attempts: u32,
    pub output_chars: usize,
}

/// Everything a caller gets back from one review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewReport {
    pub review_id: String,
    /// SHA-256 of the input text, hex encoded.
    pub input_digest: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub merged_report: String,
    pub final_text: String,
    pub tasks: Vec<TaskSummary>,
    /// Rules whose merged entry was synthesized by the guard.
    pub synthesized_rules: Vec<RuleId>,
    pub header_synthesized: bool,
}

impl ReviewReport {
    fn from_state(
        review_id: String,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        state: ReviewState,
    ) -> Self {
        let (input, tasks, merged, applied) = state.into_parts();
        let tasks = tasks
            .map(|outputs| {
                outputs
                    .iter()
                    .map(|o| TaskSummary {
                        rule_id: o.rule_id.clone(),
                        repaired: o.repaired,
                        reason: o.reason,
                        attempts: o.attempts,
                        output_chars: o.text.chars().count(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let (merged_report, synthesized_rules) = merged
            .map(|m| (m.text, m.synthesized))
            .unwrap_or_default();
        let (final_text, header_synthesized) = applied
            .map(|a| (a.text, a.header_synthesized))
            .unwrap_or_else(|| (input.to_string(), false));

        Self {
            review_id,
            input_digest: input_digest(&input),
            started_at,
            duration_ms,
            merged_report,
            final_text,
            tasks,
            synthesized_rules,
            header_synthesized,
        }
    }

    pub fn repaired_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| t.repaired).count()
    }
}

/// Hex-encoded SHA-256 of `input`.
pub fn input_digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

fn new_review_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Rules, review configuration and executor, shared read-only by every task.
#[derive(Debug, Clone)]
pub struct ReviewPipeline {
    executor: Arc<TaskExecutor>,
    rules: Arc<RuleSet>,
    config: Arc<ReviewConfig>,
}

impl ReviewPipeline {
    pub fn new(executor: TaskExecutor, rules: RuleSet, config: ReviewConfig) -> Self {
        Self {
            executor: Arc::new(executor),
            rules: Arc::new(rules),
            config: Arc::new(config),
        }
    }

    /// Executor from the environment, the default Java guidelines and default caps.
    pub fn from_env() -> Self {
        Self::new(
            TaskExecutor::from_env(),
            RuleSet::java_guidelines(),
            ReviewConfig::default(),
        )
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Run a full review of `input`.
    pub async fn run_review(&self, input: &str) -> Result<ReviewReport> {
        let review_id = new_review_id();
        let span = obs::review_span(&review_id);
        self.run_bounded(review_id, input).instrument(span).await
    }

    /// [`run_review`](Self::run_review) for synchronous callers.
    ///
    /// Builds its own multi-thread runtime; do not call from inside one.
    pub fn run_review_blocking(&self, input: &str) -> Result<ReviewReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let review_id = new_review_id();
        let _span = ReviewSpan::enter(&review_id);
        runtime.block_on(self.run_bounded(review_id, input))
    }

    async fn run_bounded(&self, review_id: String, input: &str) -> Result<ReviewReport> {
        let Some(timeout_ms) = self.config.review_timeout_ms else {
            return self.run_stages(review_id, input).await;
        };
        let id = review_id.clone();
        // On expiry the stages future is dropped, which aborts in-flight tasks
        match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.run_stages(review_id, input),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                let err = ReviewError::TimedOut { timeout_ms };
                obs::emit_review_aborted(&id, &err);
                Err(err)
            }
        }
    }

    async fn run_stages(&self, review_id: String, input: &str) -> Result<ReviewReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        obs::emit_review_started(
            &review_id,
            self.rules.len(),
            input.chars().count(),
            self.executor.provider_name(),
        );

        let state = ReviewState::new(input);

        let executor = Arc::clone(&self.executor);
        let config = Arc::clone(&self.config);
        let tasks = run_fan_out(
            &self.rules,
            Arc::clone(state.input()),
            &self.config,
            move |rule, input| {
                let executor = Arc::clone(&executor);
                let config = Arc::clone(&config);
                async move { run_analysis_task(&executor, &rule, &input, &config).await }
            },
        )
        .await?;

        let merged = run_merge(&self.executor, &tasks, &self.rules, &self.config).await;
        let applied = run_apply(
            &self.executor,
            Some(merged.text.as_str()),
            state.input(),
            &self.config,
        )
        .await;

        let state = state
            .with_tasks(tasks)
            .with_merged(merged)
            .with_applied(applied);

        let duration_ms = clock.elapsed().as_millis() as u64;
        let report = ReviewReport::from_state(review_id, started_at, duration_ms, state);
        obs::emit_review_finished(&report.review_id, duration_ms, report.repaired_tasks());
        Ok(report)
    }
}
