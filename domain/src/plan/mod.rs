//! Plan domain module
//!
//! The step graph, its copy-on-write mutations and conditional branching.

pub mod conditional;
pub mod entities;
pub mod error;
pub mod modifier;
pub mod value_objects;

pub use conditional::{
    ConditionFn, ConditionalBranch, ConditionalOutcome, ConditionalStep, ConditionalStepExecutor,
};
pub use entities::{ExecutionPlan, PlanState, PlanStep, StepStatus};
pub use error::PlanError;
pub use modifier::DynamicPlanModifier;
pub use value_objects::{
    ExecutionContext, Finding, FindingSeverity, PlanId, StepId, StepResult, StepResults,
};
