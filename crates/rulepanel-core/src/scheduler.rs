//! Fan-out/fan-in over the rule set.
//!
//! Every rule gets its own task in a `JoinSet` sharing the read-only input.
//! The caller injects the task body as an async closure, so tests can drive
//! the scheduler without a provider. Fan-in waits for every task, bounded by
//! one wall-clock deadline for the whole phase. A task that misses it, panics
//! or reports the wrong rule gets the standard stand-in. Dropping the fan-out
//! future (review timeout, caller cancellation) aborts every task still running.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{instrument, warn};

use crate::config::ReviewConfig;
use crate::error::Result;
use crate::guard::RepairReason;
use crate::obs;
use crate::rules::{Rule, RuleId, RuleSet};
use crate::state::TaskOutputs;
use crate::task::TaskOutput;

/// Run `task_fn` once per rule, concurrently, and collect one output per rule.
///
/// `task_fn` is an async closure `(Rule, Arc<str>) -> TaskOutput`. At most
/// `max_concurrent_tasks` bodies run at once. No task failure affects another.
#[instrument(skip_all, fields(rules = rules.len()))]
pub async fn run_fan_out<F, Fut>(
    rules: &RuleSet,
    input: Arc<str>,
    config: &ReviewConfig,
    task_fn: F,
) -> Result<TaskOutputs>
where
    F: Fn(Rule, Arc<str>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskOutput> + Send + 'static,
{
    let started = Instant::now();
    let deadline = started + Duration::from_millis(config.fan_out_timeout_ms);
    let task_fn = Arc::new(task_fn);

    // Semaphore enforces max_concurrent_tasks
    let sem = Arc::new(Semaphore::new(config.max_concurrent_tasks.max(1)));

    let mut join_set = JoinSet::new();
    for rule in rules.iter().cloned() {
        let task_fn = Arc::clone(&task_fn);
        let input = Arc::clone(&input);
        let sem = Arc::clone(&sem);

        join_set.spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            let rule_id = rule.id.clone();
            let result = AssertUnwindSafe(async move { task_fn(rule, input).await })
                .catch_unwind()
                .await;
            (rule_id, result)
        });
    }

    let mut settled: BTreeMap<RuleId, TaskOutput> = BTreeMap::new();
    let mut deadline_hit = false;
    loop {
        match timeout_at(deadline, join_set.join_next()).await {
            Ok(Some(Ok((rule_id, Ok(output))))) if output.rule_id == rule_id => {
                settled.insert(rule_id, output);
            }
            Ok(Some(Ok((rule_id, Ok(output))))) => {
                warn!(rule_id = %rule_id, reported = %output.rule_id, "task reported a different rule");
                let stand_in = substitute(rule_id.clone(), RepairReason::Aborted, config);
                settled.insert(rule_id, stand_in);
            }
            Ok(Some(Ok((rule_id, Err(_))))) => {
                warn!(rule_id = %rule_id, "analysis task panicked");
                let stand_in = substitute(rule_id.clone(), RepairReason::Aborted, config);
                settled.insert(rule_id, stand_in);
            }
            Ok(Some(Err(e))) => {
                warn!(error = %e, "analysis task did not complete");
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    timeout_ms = config.fan_out_timeout_ms,
                    pending = join_set.len(),
                    "fan-out deadline passed, aborting remaining tasks"
                );
                join_set.abort_all();
                deadline_hit = true;
                break;
            }
        }
    }

    let mut outputs = TaskOutputs::new();
    for rule_id in rules.ids() {
        let output = match settled.remove(rule_id) {
            Some(output) => output,
            None if deadline_hit => substitute(rule_id.clone(), RepairReason::TimedOut, config),
            None => substitute(rule_id.clone(), RepairReason::Aborted, config),
        };
        outputs.insert(output)?;
    }

    obs::emit_fan_out_completed(
        outputs.len(),
        outputs.repaired_count(),
        started.elapsed().as_millis() as u64,
    );
    Ok(outputs)
}

fn substitute(rule_id: RuleId, reason: RepairReason, config: &ReviewConfig) -> TaskOutput {
    obs::emit_task_repaired(&rule_id, reason);
    TaskOutput::stand_in(rule_id, reason, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo(rule: Rule, input: Arc<str>) -> TaskOutput {
        TaskOutput {
            text: format!("- Finding: {} on {}", rule.id, input),
            rule_id: rule.id,
            repaired: false,
            reason: None,
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn test_every_rule_gets_a_slot() {
        let rules = RuleSet::java_guidelines();
        let outputs = run_fan_out(&rules, Arc::from("src"), &ReviewConfig::default(), |rule, input| async move {
            echo(rule, input)
        })
        .await
        .unwrap();

        assert_eq!(outputs.len(), 10);
        assert!(outputs.covers(&rules));
        assert_eq!(outputs.repaired_count(), 0);
        assert_eq!(
            outputs.get(&"G07".parse().unwrap()).unwrap().text,
            "- Finding: G07 on src"
        );
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let config = ReviewConfig {
            max_concurrent_tasks: 3,
            ..ReviewConfig::default()
        };

        let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let outputs = run_fan_out(&RuleSet::java_guidelines(), Arc::from(""), &config, move |rule, input| {
            let (in_flight, peak) = (Arc::clone(&f), Arc::clone(&p));
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                echo(rule, input)
            }
        })
        .await
        .unwrap();

        assert_eq!(outputs.len(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_panicking_task_gets_stand_in() {
        let outputs = run_fan_out(
            &RuleSet::java_guidelines(),
            Arc::from(""),
            &ReviewConfig::default(),
            |rule, input| async move {
                if rule.id.as_str() == "G04" {
                    panic!("boom");
                }
                echo(rule, input)
            },
        )
        .await
        .unwrap();

        let g04 = outputs.get(&"G04".parse().unwrap()).unwrap();
        assert_eq!(g04.reason, Some(RepairReason::Aborted));
        assert!(g04.text.contains("minimal change for G04"));
        assert_eq!(outputs.repaired_count(), 1);
    }

    #[tokio::test]
    async fn test_mislabelled_output_does_not_steal_a_slot() {
        let outputs = run_fan_out(
            &RuleSet::java_guidelines(),
            Arc::from(""),
            &ReviewConfig::default(),
            |rule, input| async move {
                let mut out = echo(rule, input);
                if out.rule_id.as_str() == "G02" {
                    out.rule_id = "G01".parse().unwrap();
                }
                out
            },
        )
        .await
        .unwrap();

        assert_eq!(outputs.len(), 10);
        assert_eq!(
            outputs.get(&"G02".parse().unwrap()).unwrap().reason,
            Some(RepairReason::Aborted)
        );
        assert_eq!(outputs.get(&"G01".parse().unwrap()).unwrap().reason, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_fan_out_aborts_running_tasks() {
        let finished = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&finished);
        let (rules, config) = (RuleSet::java_guidelines(), ReviewConfig::default());
        let fan_out = run_fan_out(&rules, Arc::from(""), &config, move |rule, input| {
            let finished = Arc::clone(&f);
            async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                echo(rule, input)
            }
        });

        let cut = tokio::time::timeout(Duration::from_secs(1), fan_out).await;
        assert!(cut.is_err());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stand_in_and_abort() {
        let finished = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&finished);
        let config = ReviewConfig {
            fan_out_timeout_ms: 1_000,
            ..ReviewConfig::default()
        };
        let outputs = run_fan_out(&RuleSet::java_guidelines(), Arc::from(""), &config, move |rule, input| {
            let finished = Arc::clone(&f);
            async move {
                if rule.id.as_str() == "G09" {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                }
                echo(rule, input)
            }
        })
        .await
        .unwrap();

        assert_eq!(
            outputs.get(&"G09".parse().unwrap()).unwrap().reason,
            Some(RepairReason::TimedOut)
        );
        assert_eq!(outputs.repaired_count(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
