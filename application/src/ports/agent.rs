//! Agent ports
//!
//! [`Agent`] is the capability contract every agent exposes; [`ToolAgent`]
//! extends it with typed step execution. Implementations live outside this
//! crate (infrastructure adapters, or excluded LLM-backed agents).

use async_trait::async_trait;
use conductor_domain::{
    AgentCapabilities, AgentEvent, AgentRequest, AgentResponse, AgentSettings, ExecutionContext,
    PlanStep, StepResult, ValidationResult,
};
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised by agents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Agent disposed")]
    Disposed,
}

/// Stream of events produced by [`Agent::start`].
pub type AgentEventStream = BoxStream<'static, AgentEvent>;

/// Capability contract of an agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique id; also the agent's identity on the message bus
    fn id(&self) -> &str;

    fn capabilities(&self) -> AgentCapabilities;

    /// Single-shot call
    async fn ask(&self, request: AgentRequest) -> Result<AgentResponse, AgentError>;

    /// Streaming call; `None` when the agent does not stream
    async fn start(&self, _request: AgentRequest) -> Result<Option<AgentEventStream>, AgentError> {
        Ok(None)
    }

    async fn update_settings(&self, _settings: AgentSettings) -> Result<(), AgentError> {
        Ok(())
    }

    /// Release resources. Called once on unregister.
    async fn dispose(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

/// An agent that executes plan steps of one capability type.
#[async_trait]
pub trait ToolAgent: Agent {
    fn agent_type(&self) -> &str;

    fn tool_capabilities(&self) -> BTreeSet<String>;

    /// Request `message_type`s this agent answers on the bus
    fn supported_message_types(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn can_handle(&self, step: &PlanStep) -> bool {
        step.agent_type == self.agent_type()
    }

    fn validate_input(&self, _input: &Map<String, Value>) -> ValidationResult {
        ValidationResult::valid()
    }

    async fn execute_step(
        &self,
        step: &PlanStep,
        context: &ExecutionContext,
    ) -> Result<StepResult, AgentError>;
}
