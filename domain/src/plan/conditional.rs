//! Conditional steps - deferred choices between two candidate steps.
//!
//! A [`ConditionalStep`] is not a [`PlanStep`] itself. Once its dependencies
//! are satisfied, [`ConditionalStepExecutor`] evaluates the predicate and
//! picks exactly one concrete step to splice into the plan. Running the
//! selected step is the caller's job.

use super::entities::{ExecutionPlan, PlanStep, StepStatus};
use super::modifier::DynamicPlanModifier;
use super::value_objects::{ExecutionContext, StepId, StepResult, StepResults};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Predicate over the run-time context and prior step results.
///
/// An `Err` is treated exactly like `false`.
pub type ConditionFn =
    Arc<dyn Fn(&ExecutionContext, &StepResults) -> Result<bool, String> + Send + Sync>;

#[derive(Clone)]
pub struct ConditionalStep {
    pub id: StepId,
    pub description: String,
    pub condition: ConditionFn,
    pub then_step: PlanStep,
    pub else_step: Option<PlanStep>,
    pub dependencies: BTreeSet<StepId>,
}

impl ConditionalStep {
    pub fn new<F>(
        id: impl Into<StepId>,
        description: impl Into<String>,
        condition: F,
        then_step: PlanStep,
    ) -> Self
    where
        F: Fn(&ExecutionContext, &StepResults) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: description.into(),
            condition: Arc::new(condition),
            then_step,
            else_step: None,
            dependencies: BTreeSet::new(),
        }
    }

    pub fn with_else(mut self, else_step: PlanStep) -> Self {
        self.else_step = Some(else_step);
        self
    }

    pub fn with_dependency(mut self, step_id: impl Into<StepId>) -> Self {
        self.dependencies.insert(step_id.into());
        self
    }
}

impl std::fmt::Debug for ConditionalStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalStep")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("then_step", &self.then_step.id)
            .field("else_step", &self.else_step.as_ref().map(|s| &s.id))
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Which branch a conditional resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalBranch {
    Then,
    Else,
    /// Condition false with no else step: the then step is not executed
    Skipped,
}

/// Outcome of resolving a [`ConditionalStep`].
#[derive(Debug, Clone)]
pub struct ConditionalOutcome {
    /// The chosen step, carrying the conditional's dependencies
    pub selected_step: PlanStep,
    /// Synthetic skip result for [`ConditionalBranch::Skipped`], plain
    /// success otherwise (the real result comes from running the step)
    pub result: StepResult,
    pub branch: ConditionalBranch,
}

pub struct ConditionalStepExecutor;

impl ConditionalStepExecutor {
    /// Evaluate the condition and select the step to splice into the plan.
    ///
    /// Errors and panics raised by the predicate count as `false`.
    pub fn execute_conditional_step(
        conditional: &ConditionalStep,
        context: &ExecutionContext,
        step_results: &StepResults,
    ) -> ConditionalOutcome {
        let holds = Self::evaluate(conditional, context, step_results);

        let (mut selected_step, result, branch) = match (holds, &conditional.else_step) {
            (true, _) => (
                conditional.then_step.clone(),
                StepResult::success(Map::new()).with_metadata("branch", "then"),
                ConditionalBranch::Then,
            ),
            (false, Some(else_step)) => (
                else_step.clone(),
                StepResult::success(Map::new()).with_metadata("branch", "else"),
                ConditionalBranch::Else,
            ),
            (false, None) => (
                conditional.then_step.clone(),
                StepResult::skipped(format!(
                    "condition '{}' not met",
                    conditional.description
                )),
                ConditionalBranch::Skipped,
            ),
        };

        selected_step
            .dependencies
            .extend(conditional.dependencies.iter().cloned());
        selected_step
            .metadata
            .insert("conditional_id".to_string(), conditional.id.as_str().into());

        debug!(
            conditional = %conditional.id,
            step = %selected_step.id,
            ?branch,
            "Resolved conditional step"
        );

        ConditionalOutcome {
            selected_step,
            result,
            branch,
        }
    }

    /// Resolve every pending conditional of `plan` whose dependencies are
    /// satisfied and splice the selected step in after its last dependency.
    ///
    /// Each splice is one structural mutation (one version bump). A skip
    /// outcome is spliced as a SKIPPED step. A conditional whose step cannot
    /// be spliced (duplicate id, cycle) is dropped with a warning.
    pub fn resolve_ready(
        plan: &ExecutionPlan,
        context: &ExecutionContext,
        step_results: &StepResults,
    ) -> ExecutionPlan {
        let ready: Vec<ConditionalStep> = plan
            .conditionals
            .iter()
            .filter(|c| plan.dependencies_satisfied(&c.dependencies))
            .cloned()
            .collect();
        if ready.is_empty() {
            return plan.clone();
        }

        let mut current = plan.clone();
        for conditional in ready {
            let outcome = Self::execute_conditional_step(&conditional, context, step_results);
            let mut step = outcome.selected_step;
            if outcome.branch == ConditionalBranch::Skipped {
                step.status = StepStatus::Skipped;
                step.error = outcome
                    .result
                    .metadata
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }

            let position = current
                .steps
                .iter()
                .rposition(|s| step.dependencies.contains(&s.id))
                .map_or(current.steps.len(), |index| index + 1);

            current = match DynamicPlanModifier::insert_at(&current, vec![step], position) {
                Ok(mut next) => {
                    next.conditionals.retain(|c| c.id != conditional.id);
                    next
                }
                Err(e) => {
                    warn!(
                        conditional = %conditional.id,
                        error = %e,
                        "Cannot splice conditional step, dropping it"
                    );
                    current.conditionals.retain(|c| c.id != conditional.id);
                    current
                }
            };
        }
        current
    }

    fn evaluate(
        conditional: &ConditionalStep,
        context: &ExecutionContext,
        step_results: &StepResults,
    ) -> bool {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            (conditional.condition)(context, step_results)
        }));

        match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!(
                    conditional = %conditional.id,
                    error = %e,
                    "Condition evaluation failed, treating as false"
                );
                false
            }
            Err(_) => {
                warn!(
                    conditional = %conditional.id,
                    "Condition panicked, treating as false"
                );
                false
            }
        }
    }
}
