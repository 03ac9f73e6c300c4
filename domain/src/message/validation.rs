//! Structural validation of bus messages.

use super::entities::AgentMessage;
use super::payload::MessagePayload;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageValidationError {
    #[error("{kind} message has an empty id")]
    EmptyId { kind: &'static str },

    #[error("message {id} has an empty sender id")]
    EmptySender { id: String },

    #[error("message {id} has an empty topic")]
    EmptyTopic { id: String },

    #[error("request {id} has a zero timeout")]
    ZeroTimeout { id: String },

    #[error("response {id} does not reference a request")]
    MissingRequestId { id: String },

    #[error("progress {percent}% is outside 0..=100")]
    ProgressOutOfRange { percent: u8 },
}

impl AgentMessage {
    /// Check the structural invariants of this message.
    pub fn validate(&self) -> Result<(), MessageValidationError> {
        if self.id().trim().is_empty() {
            return Err(MessageValidationError::EmptyId {
                kind: self.kind().as_str(),
            });
        }
        if self.sender_id().trim().is_empty() {
            return Err(MessageValidationError::EmptySender {
                id: self.id().to_string(),
            });
        }

        match self {
            AgentMessage::Request(req) => {
                if req.message_type.trim().is_empty() {
                    return Err(MessageValidationError::EmptyTopic { id: req.id.clone() });
                }
                if req.timeout_ms == 0 {
                    return Err(MessageValidationError::ZeroTimeout { id: req.id.clone() });
                }
            }
            AgentMessage::Response(resp) => {
                if resp.request_id.trim().is_empty() {
                    return Err(MessageValidationError::MissingRequestId {
                        id: resp.id.clone(),
                    });
                }
            }
            AgentMessage::Event(event) => {
                if event.event_type.trim().is_empty() {
                    return Err(MessageValidationError::EmptyTopic {
                        id: event.id.clone(),
                    });
                }
            }
            AgentMessage::Ack(_) => {}
        }

        if let Some(MessagePayload::Progress { percent, .. }) = self.payload()
            && *percent > 100
        {
            return Err(MessageValidationError::ProgressOutOfRange { percent: *percent });
        }

        Ok(())
    }
}
