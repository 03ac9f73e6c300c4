//! Agent contract value objects.
//!
//! # Descriptors
//! - [`AgentCapabilities`] - What an agent declares about itself
//! - [`AgentSettings`] - Runtime-adjustable settings
//!
//! # Exchange
//! - [`AgentRequest`] / [`AgentResponse`] - Single-shot call
//! - [`AgentEvent`] - Item of a streaming call
//! - [`ValidationResult`] - Outcome of step input validation

use crate::message::{MessagePayload, RequestMessage, new_message_id};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only capability descriptor of an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    /// Keeps conversation state between calls
    pub stateful: bool,
    /// Supports `start` streaming
    pub streaming: bool,
    /// Produces explicit reasoning output
    pub reasoning: bool,
    /// Declared tool names
    pub tools: Vec<String>,
    pub system_prompt: Option<String>,
    pub response_rules: Vec<String>,
}

impl AgentCapabilities {
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Settings pushed into an agent at run time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub values: Map<String, Value>,
}

impl AgentSettings {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Single-shot request to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub id: String,
    /// Who is asking; absent for direct calls
    pub sender_id: Option<String>,
    pub message_type: String,
    pub payload: MessagePayload,
}

impl AgentRequest {
    pub fn new(message_type: impl Into<String>, payload: MessagePayload) -> Self {
        Self {
            id: new_message_id(),
            sender_id: None,
            message_type: message_type.into(),
            payload,
        }
    }

    pub fn text(message_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(message_type, MessagePayload::text(content))
    }
}

impl From<&RequestMessage> for AgentRequest {
    fn from(message: &RequestMessage) -> Self {
        Self {
            id: message.id.clone(),
            sender_id: Some(message.sender_id.clone()),
            message_type: message.message_type.clone(),
            payload: message.payload.clone(),
        }
    }
}

/// Answer to an [`AgentRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub payload: MessagePayload,
    pub error: Option<String>,
}

impl AgentResponse {
    pub fn success(payload: MessagePayload) -> Self {
        Self {
            success: true,
            payload,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            payload: MessagePayload::error("agent_error", error.clone()),
            error: Some(error),
        }
    }
}

/// One item of a streaming agent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub event_type: String,
    pub payload: MessagePayload,
    /// Set on the last event of a stream
    pub last: bool,
}

impl AgentEvent {
    pub fn new(event_type: impl Into<String>, payload: MessagePayload) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            last: false,
        }
    }

    pub fn last(mut self) -> Self {
        self.last = true;
        self
    }
}

/// Outcome of `validate_input` on a step's input map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }

    /// Valid iff `errors` is empty.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_message() {
        let message = RequestMessage::new("orchestrator", "analyze", MessagePayload::text("hi"));
        let request = AgentRequest::from(&message);
        assert_eq!(request.id, message.id);
        assert_eq!(request.sender_id.as_deref(), Some("orchestrator"));
        assert_eq!(request.message_type, "analyze");
    }

    #[test]
    fn test_failure_response_carries_error_payload() {
        let response = AgentResponse::failure("boom");
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("boom"));
        assert_eq!(response.payload.variant_name(), "error");
    }

    #[test]
    fn test_validation_from_errors() {
        assert!(ValidationResult::from_errors(vec![]).is_valid);
        let invalid = ValidationResult::from_errors(vec!["missing path".into()]);
        assert!(!invalid.is_valid);
        assert_eq!(invalid.errors.len(), 1);
    }
}
