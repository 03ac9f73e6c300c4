//! Domain layer for agent-conductor
//!
//! This crate contains the core data model and its pure transitions.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Messages
//!
//! Agents talk through tagged [`AgentMessage`]s (Request, Response, Event,
//! Ack) carrying a closed [`MessagePayload`] union.
//!
//! ## Plans
//!
//! An [`ExecutionPlan`] is a versioned DAG of [`PlanStep`]s. Structural
//! changes go through [`DynamicPlanModifier`] and return a new plan with
//! `version + 1`; prior plan values never change.
//!
//! ## Conditional Steps
//!
//! A [`ConditionalStep`] defers the choice between two steps until prior
//! results are known. [`ConditionalStepExecutor`] resolves it.

pub mod agent;
pub mod config;
pub mod message;
pub mod plan;
pub mod planning;
pub mod util;

// Re-export commonly used types
pub use agent::{
    AgentCapabilities, AgentEvent, AgentMetrics, AgentRequest, AgentResponse, AgentSettings,
    ToolAgentRegistration, ValidationResult, agent_types,
};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use message::{
    AckMessage, AckStatus, AgentMessage, EventMessage, MessageKind, MessagePayload,
    MessageValidationError, RequestMessage, ResponseMessage, TypedMessage, event_types,
};
pub use plan::{
    ConditionalBranch, ConditionalOutcome, ConditionalStep, ConditionalStepExecutor,
    DynamicPlanModifier, ExecutionContext, ExecutionPlan, Finding, FindingSeverity, PlanError,
    PlanId, PlanState, PlanStep, StepId, StepResult, StepResults, StepStatus,
};
pub use planning::{
    ComplexityLevel, ComplexitySignal, PlanningContext, RequestAnalysis, StepTemplate, TaskType,
};
