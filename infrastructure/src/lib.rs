//! Infrastructure layer for agent-conductor
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the in-process message bus, the tool agent
//! registry, shipped agents, the JSONL message journal and configuration
//! file loading.

pub mod agents;
pub mod bus;
pub mod config;
pub mod logging;
pub mod registry;

// Re-export commonly used types
pub use agents::{EchoToolAgent, LegacyAgentAdapter};
pub use bus::{
    BUS_SENDER_ID, BusError, BusMetrics, MessageBus, ORCHESTRATOR_SENDER_ID, StepEventPublisher,
    Subscription,
};
pub use config::{ConfigError, ConfigLoader, FileConfig};
pub use logging::JsonlMessageJournal;
pub use registry::{BusParticipant, REGISTRY_SENDER_ID, ToolAgentRegistry};
