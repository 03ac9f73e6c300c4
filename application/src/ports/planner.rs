//! Planner port
//!
//! Turns a request into an [`ExecutionPlan`] and, optionally, adapts the
//! plan while it runs.

use async_trait::async_trait;
use conductor_domain::{
    ComplexitySignal, ConditionalStepExecutor, ExecutionContext, ExecutionPlan, PlanError,
    PlanningContext, StepResults, TaskType,
};
use thiserror::Error;

/// Errors that end a request before any step runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("Request is empty")]
    EmptyRequest,

    #[error("No steps available for task type '{0}'")]
    EmptyPlan(TaskType),

    #[error("Invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error("Planning failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait Planner: Send + Sync {
    /// Build the initial plan (version 1, state CREATED).
    async fn create_plan(
        &self,
        request: &str,
        complexity: &ComplexitySignal,
        context: &PlanningContext,
    ) -> Result<ExecutionPlan, PlanningError>;

    /// Splice in the steps selected by conditionals that became ready.
    fn resolve_conditionals(
        &self,
        plan: &ExecutionPlan,
        context: &ExecutionContext,
        results: &StepResults,
    ) -> ExecutionPlan {
        ConditionalStepExecutor::resolve_ready(plan, context, results)
    }

    /// Rewrite the plan given the results so far. Static planners return
    /// the plan unchanged.
    fn modify_plan_based_on_results(
        &self,
        plan: &ExecutionPlan,
        _results: &StepResults,
        _context: &ExecutionContext,
    ) -> ExecutionPlan {
        plan.clone()
    }
}
