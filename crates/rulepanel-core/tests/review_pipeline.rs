//! End-to-end behaviour of `ReviewPipeline` against scripted providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rulepanel_core::{
    extract_triggers, parse_provenance_header, trigger_marker, RepairReason, ReviewConfig,
    ReviewError, ReviewPipeline, RuleSet, TaskExecutor,
};
use rulepanel_llm::{ExecutorConfig, GenerationRequest, LlmError, TextGenerator};

enum Step {
    Reply(String),
    Fail,
    Hang,
    Delay(u64, String),
}

/// Answers according to a script keyed on the prompt; records every prompt
/// and counts the calls that ran to completion.
struct Scripted {
    script: Box<dyn Fn(&str) -> Step + Send + Sync>,
    prompts: Mutex<Vec<String>>,
    completed: AtomicUsize,
}

impl Scripted {
    fn new(script: impl Fn(&str) -> Step + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        })
    }

    fn prompts_starting_with(&self, head: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with(head))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TextGenerator for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<serde_json::Value, LlmError> {
        self.prompts.lock().unwrap().push(req.prompt.clone());
        let reply = match (self.script)(&req.prompt) {
            Step::Reply(text) => Ok(serde_json::json!({ "content": text })),
            Step::Fail => Err(LlmError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
            Step::Hang => std::future::pending().await,
            Step::Delay(ms, text) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(serde_json::json!({ "content": text }))
            }
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        reply
    }
}

fn rule_of(prompt: &str) -> Option<&str> {
    prompt.strip_prefix("RULE:").and_then(|rest| rest.split(' ').next())
}

fn is_merge(prompt: &str) -> bool {
    prompt.starts_with("You are a strict integrator")
}

fn full_report(ids: &[&str]) -> String {
    ids.iter()
        .map(|id| format!("- Title: fix {id}\n- Trigger: {id}\n- Severity: Medium\n"))
        .collect::<Vec<_>>()
        .join("\n")
}

const ALL: [&str; 10] = [
    "G01", "G02", "G03", "G04", "G05", "G06", "G07", "G08", "G09", "G10",
];

fn pipeline(generator: Arc<Scripted>, config: ReviewConfig) -> ReviewPipeline {
    let executor = TaskExecutor::new(
        ExecutorConfig {
            max_attempts: 3,
            backoff_base_ms: 10,
            attempt_timeout_ms: 60_000,
            ..ExecutorConfig::default()
        },
        Some(generator as Arc<dyn TextGenerator>),
    );
    ReviewPipeline::new(executor, RuleSet::java_guidelines(), config)
}

fn stub_pipeline() -> ReviewPipeline {
    ReviewPipeline::new(
        TaskExecutor::stub(),
        RuleSet::java_guidelines(),
        ReviewConfig::default(),
    )
}

#[tokio::test]
async fn test_empty_input_in_stub_mode_covers_every_rule() {
    let report = stub_pipeline().run_review("").await.unwrap();

    assert!(report.tasks.iter().all(|t| t.repaired));
    for id in RuleSet::java_guidelines().ids() {
        assert_eq!(report.merged_report.matches(&trigger_marker(id)).count(), 1);
    }
    let header = parse_provenance_header(&report.final_text).unwrap();
    assert_eq!(header, ALL.to_vec());
    assert!(report
        .final_text
        .starts_with("/* Applied: G01,G02,G03,G04,G05,G06,G07,G08,G09,G10 */\n"));
}

#[tokio::test]
async fn test_stub_runs_are_byte_identical() {
    let input = "public class Cart {\n  public List items;\n}\n";
    let first = stub_pipeline().run_review(input).await.unwrap();
    let second = stub_pipeline().run_review(input).await.unwrap();

    assert_eq!(first.merged_report, second.merged_report);
    assert_eq!(first.final_text, second.final_text);
    assert_eq!(first.input_digest, second.input_digest);
    assert_ne!(first.review_id, second.review_id);
}

#[tokio::test]
async fn test_one_failing_task_is_repaired_and_review_proceeds() {
    let generator = Scripted::new(|prompt| match rule_of(prompt) {
        Some("G03") => Step::Fail,
        Some(id) => Step::Reply(format!("- Finding: issue for {id}")),
        None if is_merge(prompt) => Step::Reply(full_report(&ALL)),
        None => Step::Reply("/* Applied: G01,G02 */\nclass A {}".to_string()),
    });

    let report = pipeline(Arc::clone(&generator), ReviewConfig::default())
        .run_review("class A {}")
        .await
        .unwrap();

    let g03 = report
        .tasks
        .iter()
        .find(|t| t.rule_id.as_str() == "G03")
        .unwrap();
    assert!(g03.repaired);
    assert_eq!(g03.reason, Some(RepairReason::Failure));
    assert_eq!(g03.attempts, 3);
    assert_eq!(report.repaired_tasks(), 1);
    assert_eq!(generator.prompts_starting_with("RULE:G03").len(), 3);

    let merge_prompt = &generator.prompts_starting_with("You are a strict integrator")[0];
    assert!(merge_prompt.contains("RULE G03:\n- Finding: Minimal suggestion\n"));
    assert!(merge_prompt.contains("RULE G04:\n- Finding: issue for G04\n"));

    assert!(report.synthesized_rules.is_empty());
    assert!(!report.header_synthesized);
    assert_eq!(report.final_text, "/* Applied: G01,G02 */\nclass A {}");
}

#[tokio::test]
async fn test_every_call_failing_still_yields_complete_report() {
    let generator = Scripted::new(|_| Step::Fail);

    let report = pipeline(generator, ReviewConfig::default())
        .run_review("class A {}")
        .await
        .unwrap();

    assert_eq!(report.repaired_tasks(), 10);
    assert_eq!(report.synthesized_rules.len(), 10);
    assert_eq!(extract_triggers(&report.merged_report).len(), 10);
    assert!(report.header_synthesized);
}

#[tokio::test]
async fn test_merge_missing_three_rules_gets_three_appended_in_order() {
    let partial = full_report(&["G01", "G02", "G04", "G05", "G07", "G08", "G10"]);
    let merged = partial.clone();
    let generator = Scripted::new(move |prompt| match rule_of(prompt) {
        Some(id) => Step::Reply(format!("- Finding: issue for {id}")),
        None if is_merge(prompt) => Step::Reply(merged.clone()),
        None => Step::Reply("class A {}".to_string()),
    });

    let report = pipeline(generator, ReviewConfig::default())
        .run_review("class A {}")
        .await
        .unwrap();

    let ids: Vec<&str> = report.synthesized_rules.iter().map(|i| i.as_str()).collect();
    assert_eq!(ids, vec!["G03", "G06", "G09"]);
    assert!(report.merged_report.starts_with(&partial));
    let tail = &report.merged_report[partial.len()..];
    let positions: Vec<usize> = ["Trigger: G03", "Trigger: G06", "Trigger: G09"]
        .iter()
        .map(|m| tail.find(m).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(report
        .final_text
        .starts_with("/* Applied: G01,G02,G03,G04,G05,G06,G07,G08,G09,G10 */\nclass A {}"));
}

#[tokio::test(start_paused = true)]
async fn test_merge_input_order_ignores_completion_order() {
    // G01 finishes last, G10 first
    let generator = Scripted::new(|prompt| match rule_of(prompt) {
        Some(id) => {
            let n: u64 = id[1..].parse().unwrap();
            Step::Delay((11 - n) * 100, format!("- Finding: {id}"))
        }
        None if is_merge(prompt) => Step::Reply(full_report(&ALL)),
        None => Step::Reply("class A {}".to_string()),
    });

    pipeline(Arc::clone(&generator), ReviewConfig::default())
        .run_review("class A {}")
        .await
        .unwrap();

    let merge_prompt = &generator.prompts_starting_with("You are a strict integrator")[0];
    let positions: Vec<usize> = ALL
        .iter()
        .map(|id| merge_prompt.find(&format!("RULE {id}:\n- Finding: {id}\n")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_task_is_cut_off_by_fan_out_deadline() {
    let generator = Scripted::new(|prompt| match rule_of(prompt) {
        Some("G05") => Step::Hang,
        Some(id) => Step::Reply(format!("- Finding: {id}")),
        None if is_merge(prompt) => Step::Reply(full_report(&ALL)),
        None => Step::Reply("class A {}".to_string()),
    });
    let config = ReviewConfig {
        fan_out_timeout_ms: 2_000,
        ..ReviewConfig::default()
    };

    let started = tokio::time::Instant::now();
    let report = pipeline(generator, config).run_review("class A {}").await.unwrap();

    let g05 = report
        .tasks
        .iter()
        .find(|t| t.rule_id.as_str() == "G05")
        .unwrap();
    assert_eq!(g05.reason, Some(RepairReason::TimedOut));
    assert_eq!(report.repaired_tasks(), 1);
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_review_timeout_aborts_whole_request() {
    let generator = Scripted::new(|_| Step::Delay(30_000, "- Finding: late".to_string()));
    let config = ReviewConfig {
        review_timeout_ms: Some(5_000),
        ..ReviewConfig::default()
    };

    let err = pipeline(Arc::clone(&generator), config)
        .run_review("class A {}")
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::TimedOut { timeout_ms: 5_000 }));

    let started = generator.prompts.lock().unwrap().len();
    assert!(started > 0);

    // Abandoned provider calls must not resume once the clock moves on
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(generator.completed.load(Ordering::SeqCst), 0);
    assert_eq!(generator.prompts.lock().unwrap().len(), started);
}

#[tokio::test]
async fn test_long_input_and_reply_are_truncated_with_markers() {
    let long_reply = "x".repeat(50);
    let reply = long_reply.clone();
    let generator = Scripted::new(move |prompt| match rule_of(prompt) {
        Some(_) => Step::Reply(reply.clone()),
        None if is_merge(prompt) => Step::Reply(full_report(&ALL)),
        None => Step::Reply("class A {}".to_string()),
    });
    let config = ReviewConfig {
        max_input_chars: 16,
        max_task_output_chars: 20,
        ..ReviewConfig::default()
    };
    let input = "a".repeat(40);

    pipeline(Arc::clone(&generator), config)
        .run_review(&input)
        .await
        .unwrap();

    let rule_prompt = &generator.prompts_starting_with("RULE:G01")[0];
    assert!(rule_prompt.contains(&format!(
        "CODE:\n/* TRUNCATED: original_length=40 chars */\n{}\n",
        "a".repeat(16)
    )));
    let merge_prompt = &generator.prompts_starting_with("You are a strict integrator")[0];
    assert!(merge_prompt.contains(&format!(
        "RULE G01:\n{}\n/* TRUNCATED */\n",
        "x".repeat(20)
    )));
}
