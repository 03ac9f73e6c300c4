//! Message model for agent-to-agent communication
//!
//! Messages are pure data. Routing, correlation and acknowledgement live
//! in the infrastructure message bus.

pub mod entities;
pub mod payload;
pub mod validation;

pub use entities::{
    AckMessage, AckStatus, AgentMessage, EventMessage, MessageKind, RequestMessage,
    ResponseMessage, TypedMessage, event_types, new_message_id,
};
pub use payload::MessagePayload;
pub use validation::MessageValidationError;
