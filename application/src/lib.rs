//! Application layer for agent-conductor
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{
    BusParams, CoordinationConfig, OrchestratorParams, PlannerParams, RegistryParams,
};
pub use ports::{
    agent::{Agent, AgentError, AgentEventStream, ToolAgent},
    message_journal::{JournalEntry, MessageJournal, NoMessageJournal},
    planner::{Planner, PlanningError},
    progress::{
        CompositeProgress, ExecutionSummary, NoProgress, ProgressEvent, ProgressListener,
    },
    resolver::AgentResolver,
};
pub use use_cases::adaptive_planner::AdaptivePlanner;
pub use use_cases::orchestrator::{
    FinalResponse, Orchestrator, OrchestratorError, OrchestratorInput,
};
pub use use_cases::request_planner::RequestPlanner;
