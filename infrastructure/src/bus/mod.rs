//! Message bus - in-process pub/sub and request/response between agents,
//! plus [`StepEventPublisher`] for announcing step progress on it.

pub mod error;
mod message_bus;
mod metrics;
mod step_events;
mod subscription;

pub use error::BusError;
pub use message_bus::{BUS_SENDER_ID, MessageBus};
pub use metrics::BusMetrics;
pub use step_events::{ORCHESTRATOR_SENDER_ID, StepEventPublisher};
pub use subscription::Subscription;
