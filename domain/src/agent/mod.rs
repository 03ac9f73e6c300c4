//! Agent domain module
//!
//! Descriptors and value objects exchanged with agents, plus the
//! registry's per-agent records.

pub mod agent_types;
pub mod entities;
pub mod value_objects;

pub use entities::{AgentMetrics, ToolAgentRegistration};
pub use value_objects::{
    AgentCapabilities, AgentEvent, AgentRequest, AgentResponse, AgentSettings, ValidationResult,
};
