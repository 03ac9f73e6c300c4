//! Step lifecycle events on the message bus.

use super::message_bus::MessageBus;
use conductor_application::{ProgressEvent, ProgressListener};
use conductor_domain::{EventMessage, MessagePayload, StepStatus, event_types};
use std::sync::Arc;
use tracing::debug;

/// Sender id of step lifecycle events.
pub const ORCHESTRATOR_SENDER_ID: &str = "orchestrator";

/// Progress listener republishing step progress as bus events.
///
/// `TaskStarted` becomes `STEP_STARTED` and `TaskComplete` becomes
/// `STEP_COMPLETED`, each with an `ExecutionStatus` payload. Other progress
/// events stay off the bus.
pub struct StepEventPublisher {
    bus: Arc<MessageBus>,
    sender_id: String,
}

impl StepEventPublisher {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self {
            bus,
            sender_id: ORCHESTRATOR_SENDER_ID.to_string(),
        }
    }

    pub fn with_sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    fn publish(&self, event_type: &str, payload: MessagePayload) {
        let event = EventMessage::new(self.sender_id.as_str(), event_type, payload);
        if let Err(e) = self.bus.publish(event) {
            debug!(event_type, error = %e, "Could not publish step event");
        }
    }
}

impl ProgressListener for StepEventPublisher {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::TaskStarted {
                plan_id, step_id, ..
            } => self.publish(
                event_types::STEP_STARTED,
                MessagePayload::ExecutionStatus {
                    plan_id: plan_id.clone(),
                    step_id: step_id.clone(),
                    status: StepStatus::Running.as_str().to_string(),
                    detail: None,
                },
            ),
            ProgressEvent::TaskComplete {
                plan_id,
                step_id,
                success,
                error,
                ..
            } => {
                let status = if *success {
                    StepStatus::Completed
                } else {
                    StepStatus::Failed
                };
                self.publish(
                    event_types::STEP_COMPLETED,
                    MessagePayload::ExecutionStatus {
                        plan_id: plan_id.clone(),
                        step_id: step_id.clone(),
                        status: status.as_str().to_string(),
                        detail: error.clone(),
                    },
                );
            }
            _ => {}
        }
    }
}
