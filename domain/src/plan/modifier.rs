//! Versioned, copy-on-write plan mutations.
//!
//! Every operation takes the current plan by reference and returns a new
//! [`ExecutionPlan`]; the input is never modified, so holders of an older
//! version keep a consistent snapshot. A successful structural mutation
//! bumps `version` by exactly one. Operations whose target step does not
//! exist return an unchanged copy (same version) and log a warning.
//!
//! Mutations that would break the DAG (cycle, duplicate id, dependency on
//! an unknown step) are rejected with a [`PlanError`].

use super::entities::{ExecutionPlan, PlanState, PlanStep, StepStatus};
use super::error::PlanError;
use super::value_objects::{PlanId, StepId};
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

pub struct DynamicPlanModifier;

impl DynamicPlanModifier {
    /// Insert `step` right after `anchor`, or at the end if the anchor is missing.
    pub fn add_step_after(
        plan: &ExecutionPlan,
        step: PlanStep,
        anchor: &StepId,
    ) -> Result<ExecutionPlan, PlanError> {
        Self::add_steps_after(plan, vec![step], anchor)
    }

    /// Insert `steps` (in order) right after `anchor`, or at the end if the
    /// anchor is missing. One version bump for the whole batch.
    pub fn add_steps_after(
        plan: &ExecutionPlan,
        steps: Vec<PlanStep>,
        anchor: &StepId,
    ) -> Result<ExecutionPlan, PlanError> {
        let position = match plan.step_index(anchor) {
            Some(index) => index + 1,
            None => {
                warn!(anchor = %anchor, plan = %plan.id, "Anchor step not found, appending at end");
                plan.steps.len()
            }
        };
        Self::insert_at(plan, steps, position)
    }

    /// Insert `step` right before `anchor`, or at the end if the anchor is missing.
    pub fn add_step_before(
        plan: &ExecutionPlan,
        step: PlanStep,
        anchor: &StepId,
    ) -> Result<ExecutionPlan, PlanError> {
        let position = match plan.step_index(anchor) {
            Some(index) => index,
            None => {
                warn!(anchor = %anchor, plan = %plan.id, "Anchor step not found, appending at end");
                plan.steps.len()
            }
        };
        Self::insert_at(plan, vec![step], position)
    }

    /// Remove a step and drop it from every other step's dependency set.
    pub fn remove_step(plan: &ExecutionPlan, step_id: &StepId) -> ExecutionPlan {
        let Some(index) = plan.step_index(step_id) else {
            warn!(step = %step_id, plan = %plan.id, "Cannot remove unknown step, plan unchanged");
            return plan.clone();
        };

        let mut next = plan.clone();
        next.steps.remove(index);
        for step in &mut next.steps {
            step.dependencies.remove(step_id);
        }
        for conditional in &mut next.conditionals {
            conditional.dependencies.remove(step_id);
        }
        next.bump_version();
        debug!(step = %step_id, version = next.version, "Removed step");
        next
    }

    /// Put `new_step` in the position of `step_id`.
    ///
    /// If the replacement has a different id, dependents are rewired to it.
    pub fn replace_step(
        plan: &ExecutionPlan,
        step_id: &StepId,
        new_step: PlanStep,
    ) -> Result<ExecutionPlan, PlanError> {
        let Some(index) = plan.step_index(step_id) else {
            warn!(step = %step_id, plan = %plan.id, "Cannot replace unknown step, plan unchanged");
            return Ok(plan.clone());
        };

        let mut next = plan.clone();
        let new_id = new_step.id.clone();
        next.steps[index] = new_step;

        if &new_id != step_id {
            for step in next.steps.iter_mut().filter(|s| s.id != new_id) {
                if step.dependencies.remove(step_id) {
                    step.dependencies.insert(new_id.clone());
                }
            }
            for conditional in &mut next.conditionals {
                if conditional.dependencies.remove(step_id) {
                    conditional.dependencies.insert(new_id.clone());
                }
            }
        }

        Self::commit(next)
    }

    /// Reorder steps following `order`.
    ///
    /// Unknown ids in `order` are ignored and steps missing from it keep their
    /// relative order at the tail, so the step set is always preserved.
    pub fn reorder_steps(plan: &ExecutionPlan, order: &[StepId]) -> ExecutionPlan {
        let mut placed: HashSet<&StepId> = HashSet::new();
        let mut steps = Vec::with_capacity(plan.steps.len());

        for id in order {
            if placed.contains(id) {
                continue;
            }
            match plan.step(id) {
                Some(step) => {
                    placed.insert(&step.id);
                    steps.push(step.clone());
                }
                None => debug!(step = %id, "Ignoring unknown step id in reorder"),
            }
        }

        for step in &plan.steps {
            if !placed.contains(&step.id) {
                steps.push(step.clone());
            }
        }

        let mut next = plan.clone();
        next.steps = steps;
        next.bump_version();
        next
    }

    /// Mark a step SKIPPED. The step stays in the plan and, since SKIPPED
    /// satisfies dependencies, its dependents can still run.
    pub fn skip_step(plan: &ExecutionPlan, step_id: &StepId, reason: Option<&str>) -> ExecutionPlan {
        let mut next = plan.clone();
        if !next.set_step_status(step_id, StepStatus::Skipped, reason.map(str::to_string)) {
            warn!(step = %step_id, plan = %plan.id, "Cannot skip unknown step, plan unchanged");
            return plan.clone();
        }
        next.bump_version();
        next
    }

    /// Replace a step's dependency set.
    pub fn update_dependencies(
        plan: &ExecutionPlan,
        step_id: &StepId,
        dependencies: BTreeSet<StepId>,
    ) -> Result<ExecutionPlan, PlanError> {
        let Some(index) = plan.step_index(step_id) else {
            warn!(step = %step_id, plan = %plan.id, "Cannot update dependencies of unknown step");
            return Ok(plan.clone());
        };

        let mut next = plan.clone();
        next.steps[index].dependencies = dependencies;
        Self::commit(next)
    }

    pub fn add_metadata(plan: &ExecutionPlan, key: impl Into<String>, value: Value) -> ExecutionPlan {
        let mut next = plan.clone();
        next.metadata.insert(key.into(), value);
        next.bump_version();
        next
    }

    /// Copy a plan for re-execution under a new id.
    ///
    /// All steps return to PENDING and the plan to CREATED; the source id is
    /// kept under the `cloned_from` metadata key.
    pub fn clone_plan(plan: &ExecutionPlan, new_id: Option<PlanId>) -> ExecutionPlan {
        let mut next = plan.clone();
        next.id = new_id.unwrap_or_else(PlanId::generate);
        next.current_state = PlanState::Created;
        next.created_at = Utc::now();
        for step in &mut next.steps {
            step.status = StepStatus::Pending;
            step.error = None;
        }
        next.metadata
            .insert("cloned_from".to_string(), plan.id.as_str().into());
        next.bump_version();
        next
    }

    pub(crate) fn insert_at(
        plan: &ExecutionPlan,
        steps: Vec<PlanStep>,
        position: usize,
    ) -> Result<ExecutionPlan, PlanError> {
        let mut next = plan.clone();
        let position = position.min(next.steps.len());
        let inserted: Vec<StepId> = steps.iter().map(|s| s.id.clone()).collect();
        next.steps.splice(position..position, steps);
        let next = Self::commit(next)?;
        debug!(steps = ?inserted, position, version = next.version, "Inserted steps");
        Ok(next)
    }

    /// Validate the candidate and bump its version.
    fn commit(mut candidate: ExecutionPlan) -> Result<ExecutionPlan, PlanError> {
        candidate.validate()?;
        candidate.bump_version();
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::{ComplexitySignal, RequestAnalysis, TaskType};

    fn plan() -> ExecutionPlan {
        ExecutionPlan::new(
            "fix the login bug",
            RequestAnalysis::new(TaskType::BugFix, ComplexitySignal::default()),
        )
        .with_step(PlanStep::new("detect", "bug_detector", "Detect"))
        .with_step(PlanStep::new("check", "code_quality", "Check").with_dependency("detect"))
        .with_step(PlanStep::new("fix", "code_fixer", "Fix").with_dependency("check"))
    }

    fn ids(plan: &ExecutionPlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_add_step_after_bumps_version_and_keeps_original() {
        let original = plan();
        let step = PlanStep::new("triage", "code_quality", "Triage").with_dependency("check");
        let next = DynamicPlanModifier::add_step_after(&original, step, &"check".into()).unwrap();

        assert_eq!(next.version, original.version + 1);
        assert_eq!(ids(&next), vec!["detect", "check", "triage", "fix"]);
        assert_eq!(ids(&original), vec!["detect", "check", "fix"]);
        assert_eq!(original.version, 1);
    }

    #[test]
    fn test_add_step_with_missing_anchor_appends() {
        let next = DynamicPlanModifier::add_step_after(
            &plan(),
            PlanStep::new("doc", "documentation", "Document"),
            &"ghost".into(),
        )
        .unwrap();
        assert_eq!(ids(&next).last(), Some(&"doc"));
        assert_eq!(next.version, 2);
    }

    #[test]
    fn test_add_step_before() {
        let next = DynamicPlanModifier::add_step_before(
            &plan(),
            PlanStep::new("scan", "project_scanner", "Scan"),
            &"detect".into(),
        )
        .unwrap();
        assert_eq!(ids(&next), vec!["scan", "detect", "check", "fix"]);
    }

    #[test]
    fn test_add_steps_after_single_bump() {
        let next = DynamicPlanModifier::add_steps_after(
            &plan(),
            vec![
                PlanStep::new("a", "t", "A"),
                PlanStep::new("b", "t", "B").with_dependency("a"),
            ],
            &"detect".into(),
        )
        .unwrap();
        assert_eq!(ids(&next), vec!["detect", "a", "b", "check", "fix"]);
        assert_eq!(next.version, 2);
    }

    #[test]
    fn test_insert_rejects_duplicate_and_unknown_dependency() {
        let original = plan();
        let dup = DynamicPlanModifier::add_step_after(
            &original,
            PlanStep::new("fix", "code_fixer", "Fix again"),
            &"fix".into(),
        );
        assert_eq!(dup.unwrap_err(), PlanError::DuplicateStep("fix".into()));

        let dangling = DynamicPlanModifier::add_step_after(
            &original,
            PlanStep::new("x", "t", "X").with_dependency("nowhere"),
            &"fix".into(),
        );
        assert!(matches!(
            dangling,
            Err(PlanError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_remove_step_strips_dependents() {
        let next = DynamicPlanModifier::remove_step(&plan(), &"check".into());
        assert_eq!(ids(&next), vec!["detect", "fix"]);
        assert!(next.step(&"fix".into()).unwrap().dependencies.is_empty());
        assert_eq!(next.version, 2);
    }

    #[test]
    fn test_remove_missing_step_is_noop() {
        let original = plan();
        let next = DynamicPlanModifier::remove_step(&original, &"ghost".into());
        assert_eq!(next.version, original.version);
        assert_eq!(ids(&next), ids(&original));
    }

    #[test]
    fn test_replace_step_rewires_dependents() {
        let next = DynamicPlanModifier::replace_step(
            &plan(),
            &"check".into(),
            PlanStep::new("deep_check", "code_quality", "Deep check").with_dependency("detect"),
        )
        .unwrap();
        assert_eq!(ids(&next), vec!["detect", "deep_check", "fix"]);
        let fix = next.step(&"fix".into()).unwrap();
        assert!(fix.dependencies.contains(&StepId::new("deep_check")));
        assert!(!fix.dependencies.contains(&StepId::new("check")));
        assert_eq!(next.version, 2);
    }

    #[test]
    fn test_replace_rejects_cycle() {
        let original = plan();
        let result = DynamicPlanModifier::replace_step(
            &original,
            &"detect".into(),
            PlanStep::new("detect", "bug_detector", "Detect").with_dependency("fix"),
        );
        assert!(matches!(result, Err(PlanError::CycleDetected(_))));
        assert!(original.step(&"detect".into()).unwrap().dependencies.is_empty());
    }

    #[test]
    fn test_reorder_preserves_step_set() {
        let original = plan();
        let next = DynamicPlanModifier::reorder_steps(
            &original,
            &["fix".into(), "unknown".into(), "fix".into()],
        );
        assert_eq!(ids(&next), vec!["fix", "detect", "check"]);

        let before: HashSet<_> = original.step_ids().into_iter().collect();
        let after: HashSet<_> = next.step_ids().into_iter().collect();
        assert_eq!(before, after);
        assert_eq!(next.version, 2);
    }

    #[test]
    fn test_skip_step_keeps_step_and_unblocks_dependents() {
        let next = DynamicPlanModifier::skip_step(&plan(), &"detect".into(), Some("not needed"));
        let detect = next.step(&"detect".into()).unwrap();
        assert_eq!(detect.status, StepStatus::Skipped);
        assert_eq!(detect.error.as_deref(), Some("not needed"));
        assert_eq!(next.next_ready_step().unwrap().id.as_str(), "check");
        assert_eq!(next.version, 2);
    }

    #[test]
    fn test_update_dependencies_guards_cycles() {
        let original = plan();
        let cyclic = DynamicPlanModifier::update_dependencies(
            &original,
            &"detect".into(),
            BTreeSet::from(["fix".into()]),
        );
        assert!(matches!(cyclic, Err(PlanError::CycleDetected(_))));

        let next = DynamicPlanModifier::update_dependencies(
            &original,
            &"fix".into(),
            BTreeSet::from(["detect".into(), "check".into()]),
        )
        .unwrap();
        assert_eq!(next.step(&"fix".into()).unwrap().dependencies.len(), 2);
        assert_eq!(next.version, 2);
    }

    #[test]
    fn test_every_mutation_bumps_exactly_once() {
        let v1 = plan();
        let v2 = DynamicPlanModifier::add_metadata(&v1, "origin", Value::from("test"));
        let v3 = DynamicPlanModifier::reorder_steps(&v2, &[]);
        let v4 = DynamicPlanModifier::skip_step(&v3, &"fix".into(), None);
        let v5 = DynamicPlanModifier::remove_step(&v4, &"fix".into());
        assert_eq!(
            [v1.version, v2.version, v3.version, v4.version, v5.version],
            [1, 2, 3, 4, 5]
        );
        assert!(v1.metadata.is_empty());
        assert_eq!(v3.steps.len(), 3);
    }

    #[test]
    fn test_clone_plan_resets_statuses() {
        let mut original = plan();
        original.set_step_status(&"detect".into(), StepStatus::Completed, None);
        original.set_state(PlanState::Running);

        let copy = DynamicPlanModifier::clone_plan(&original, Some("retry-1".into()));
        assert_eq!(copy.id.as_str(), "retry-1");
        assert_eq!(copy.current_state, PlanState::Created);
        assert!(copy.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(
            copy.metadata.get("cloned_from").and_then(Value::as_str),
            Some(original.id.as_str())
        );
        assert_eq!(copy.version, original.version + 1);
        assert_eq!(original.step(&"detect".into()).unwrap().status, StepStatus::Completed);
    }
}
