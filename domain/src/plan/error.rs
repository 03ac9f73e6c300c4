//! Plan error types

use super::value_objects::StepId;
use thiserror::Error;

/// Errors raised when a plan would violate its structural invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Step not found: {0}")]
    StepNotFound(StepId),

    #[error("Duplicate step id: {0}")]
    DuplicateStep(StepId),

    #[error("Step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: StepId, dependency: StepId },

    #[error("Dependency cycle detected through step {0}")]
    CycleDetected(StepId),

    #[error("Plan has no steps")]
    EmptyPlan,
}
