//! Per-request review state.
//!
//! Each field is filled by exactly one stage through its return value and
//! never cleared. Task slots are write-once.

use std::collections::btree_map::{self, BTreeMap};
use std::sync::Arc;

use crate::apply::AppliedText;
use crate::error::{Result, ReviewError};
use crate::merge::MergedReport;
use crate::rules::{RuleId, RuleSet};
use crate::task::TaskOutput;

/// Task outputs keyed by rule, iterated in ascending rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutputs {
    slots: BTreeMap<RuleId, TaskOutput>,
}

impl TaskOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the slot for `output.rule_id`; an occupied slot is never overwritten.
    pub fn insert(&mut self, output: TaskOutput) -> Result<()> {
        match self.slots.entry(output.rule_id.clone()) {
            btree_map::Entry::Occupied(entry) => Err(ReviewError::SlotTaken(entry.key().clone())),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(output);
                Ok(())
            }
        }
    }

    pub fn get(&self, rule_id: &RuleId) -> Option<&TaskOutput> {
        self.slots.get(rule_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskOutput> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn repaired_count(&self) -> usize {
        self.slots.values().filter(|o| o.repaired).count()
    }

    /// `true` once every rule in `rules` has a slot.
    pub fn covers(&self, rules: &RuleSet) -> bool {
        rules.ids().all(|id| self.slots.contains_key(id))
    }
}

/// The unit of work flowing through the pipeline.
#[derive(Debug, Clone)]
pub struct ReviewState {
    input: Arc<str>,
    tasks: Option<TaskOutputs>,
    merged: Option<MergedReport>,
    applied: Option<AppliedText>,
}

impl ReviewState {
    pub fn new(input: impl Into<Arc<str>>) -> Self {
        Self {
            input: input.into(),
            tasks: None,
            merged: None,
            applied: None,
        }
    }

    pub fn input(&self) -> &Arc<str> {
        &self.input
    }

    pub fn tasks(&self) -> Option<&TaskOutputs> {
        self.tasks.as_ref()
    }

    pub fn merged(&self) -> Option<&MergedReport> {
        self.merged.as_ref()
    }

    pub fn applied(&self) -> Option<&AppliedText> {
        self.applied.as_ref()
    }

    pub fn with_tasks(self, tasks: TaskOutputs) -> Self {
        Self {
            tasks: Some(tasks),
            ..self
        }
    }

    pub fn with_merged(self, merged: MergedReport) -> Self {
        Self {
            merged: Some(merged),
            ..self
        }
    }

    pub fn with_applied(self, applied: AppliedText) -> Self {
        Self {
            applied: Some(applied),
            ..self
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Arc<str>,
        Option<TaskOutputs>,
        Option<MergedReport>,
        Option<AppliedText>,
    ) {
        (self.input, self.tasks, self.merged, self.applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReviewConfig;
    use crate::guard::RepairReason;

    fn output(id: &str, text: &str) -> TaskOutput {
        TaskOutput {
            rule_id: id.parse().unwrap(),
            text: text.to_string(),
            repaired: false,
            reason: None,
            attempts: 1,
        }
    }

    #[test]
    fn test_slot_is_write_once() {
        let mut outputs = TaskOutputs::new();
        outputs.insert(output("G01", "first")).unwrap();

        let err = outputs.insert(output("G01", "second")).unwrap_err();

        assert!(matches!(err, ReviewError::SlotTaken(ref id) if id.as_str() == "G01"));
        assert_eq!(outputs.get(&"G01".parse().unwrap()).unwrap().text, "first");
    }

    #[test]
    fn test_iteration_is_ascending_regardless_of_insert_order() {
        let mut outputs = TaskOutputs::new();
        for id in ["G10", "G02", "G01"] {
            outputs.insert(output(id, id)).unwrap();
        }
        let order: Vec<&str> = outputs.iter().map(|o| o.rule_id.as_str()).collect();
        assert_eq!(order, vec!["G01", "G02", "G10"]);
    }

    #[test]
    fn test_covers_and_repaired_count() {
        let rules = RuleSet::new(vec![
            crate::rules::Rule::new("G01", "a", "b").unwrap(),
            crate::rules::Rule::new("G02", "a", "b").unwrap(),
        ])
        .unwrap();
        let mut outputs = TaskOutputs::new();
        outputs.insert(output("G01", "x")).unwrap();
        assert!(!outputs.covers(&rules));
        outputs
            .insert(TaskOutput::stand_in(
                "G02".parse().unwrap(),
                RepairReason::Empty,
                &ReviewConfig::default(),
            ))
            .unwrap();
        assert!(outputs.covers(&rules));
        assert_eq!(outputs.repaired_count(), 1);
    }

    #[test]
    fn test_state_fills_progressively() {
        let state = ReviewState::new("class A {}");
        assert!(state.tasks().is_none());
        let state = state.with_tasks(TaskOutputs::new());
        assert!(state.tasks().is_some());
        assert!(state.merged().is_none());
        assert_eq!(&**state.input(), "class A {}");
    }
}
