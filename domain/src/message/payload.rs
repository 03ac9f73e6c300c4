//! Message payloads carried by every [`AgentMessage`](super::AgentMessage).
//!
//! [`MessagePayload`] is a closed set of variants. A payload's variant is
//! fixed at construction; consumers pattern-match on it and build a new
//! payload rather than editing one in place.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed payload union for bus messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    /// Free-form text (prompts, answers, notes)
    Text { content: String },
    /// Structured key-value data
    Structured { data: Map<String, Value> },
    /// An error report
    Error {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Progress of a long-running operation (percent in 0..=100)
    Progress {
        percent: u8,
        message: String,
    },
    /// Agent announcement (initialization, shutdown, heartbeat)
    AgentInfo {
        agent_id: String,
        agent_type: String,
        capabilities: Vec<String>,
    },
    /// Status change of a plan step
    ExecutionStatus {
        plan_id: String,
        step_id: String,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// Anything else, tagged by a caller-defined kind
    Custom { kind: String, data: Value },
}

impl MessagePayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn structured(data: Map<String, Value>) -> Self {
        Self::Structured { data }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn progress(percent: u8, message: impl Into<String>) -> Self {
        Self::Progress {
            percent,
            message: message.into(),
        }
    }

    pub fn custom(kind: impl Into<String>, data: Value) -> Self {
        Self::Custom {
            kind: kind.into(),
            data,
        }
    }

    /// Short name of the variant, used in logs and journals.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Structured { .. } => "structured",
            Self::Error { .. } => "error",
            Self::Progress { .. } => "progress",
            Self::AgentInfo { .. } => "agent_info",
            Self::ExecutionStatus { .. } => "execution_status",
            Self::Custom { .. } => "custom",
        }
    }

    /// Text view of the payload, if it has a natural one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { content } => Some(content),
            Self::Error { message, .. } => Some(message),
            Self::Progress { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl Default for MessagePayload {
    fn default() -> Self {
        Self::Text {
            content: String::new(),
        }
    }
}
