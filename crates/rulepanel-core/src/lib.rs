//! rulepanel-core: fan-out/fan-in rule review orchestration
//!
//! One analysis task per rule runs concurrently over shared read-only input.
//! A completeness guard repairs degenerate task replies, an integrator call
//! merges everything into one rule-indexed report, the guard runs again on
//! that report, and a final call rewrites the input accordingly.
//!
//! ## Layer 1 - Orchestration
//!
//! Focus: every rule is always represented, whatever the provider does.

mod error;

pub mod apply;
pub mod config;
pub mod guard;
pub mod merge;
pub mod obs;
pub mod pipeline;
pub mod prompt;
pub mod rules;
pub mod sanitize;
pub mod scheduler;
pub mod state;
pub mod task;
pub mod telemetry;
pub mod text;

pub use apply::{
    parse_provenance_header, provenance_header, run_apply, starts_with_provenance_header,
    AppliedText,
};
pub use config::ReviewConfig;
pub use error::{Result, ReviewError};
pub use guard::{
    complete_report, extract_triggers, has_marker, trigger_marker, GuardedReport, RepairReason,
};
pub use merge::{assemble_merge_input, run_merge, MergedReport};
pub use pipeline::{input_digest, ReviewPipeline, ReviewReport, TaskSummary};
pub use rules::{Rule, RuleId, RuleSet};
pub use scheduler::run_fan_out;
pub use state::{ReviewState, TaskOutputs};
pub use task::{run_analysis_task, TaskOutput};
pub use telemetry::init_tracing;
pub use text::{ensure_short, truncate_input};

pub use rulepanel_llm::TaskExecutor;
