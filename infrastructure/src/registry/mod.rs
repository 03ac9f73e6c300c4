//! Tool agent registry - discovery, liveness and lifecycle of agents.

mod participant;
mod tool_agent_registry;

pub use participant::BusParticipant;
pub use tool_agent_registry::{REGISTRY_SENDER_ID, ToolAgentRegistry};
