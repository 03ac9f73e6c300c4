//! Bus message types.
//!
//! Every message is one of four shapes ([`MessageKind`]). Each shape is a
//! standalone struct so that typed subscribers can receive exactly the
//! variant they asked for; [`AgentMessage`] wraps them for the untyped path.

use super::payload::MessagePayload;
use serde::{Deserialize, Serialize};

/// Well-known event types published by the registry and orchestrator.
pub mod event_types {
    pub const AGENT_INITIALIZED: &str = "AGENT_INITIALIZED";
    pub const AGENT_SHUTDOWN: &str = "AGENT_SHUTDOWN";
    pub const AGENT_HEARTBEAT: &str = "AGENT_HEARTBEAT";
    pub const STEP_STARTED: &str = "STEP_STARTED";
    pub const STEP_COMPLETED: &str = "STEP_COMPLETED";
}

/// Default timeout for requests built without an explicit one.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Static type tag carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Request,
    Response,
    Event,
    Ack,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
            MessageKind::Event => "event",
            MessageKind::Ack => "ack",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery confirmation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AckStatus {
    Received,
    Processed,
    Rejected,
}

/// Generate a fresh message id.
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub id: String,
    pub sender_id: String,
    /// Addressed agent; `None` means any agent supporting `message_type`
    pub target_id: Option<String>,
    pub message_type: String,
    pub payload: MessagePayload,
    pub timeout_ms: u64,
}

impl RequestMessage {
    pub fn new(
        sender_id: impl Into<String>,
        message_type: impl Into<String>,
        payload: MessagePayload,
    ) -> Self {
        Self {
            id: new_message_id(),
            sender_id: sender_id.into(),
            target_id: None,
            message_type: message_type.into(),
            payload,
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Whether an agent with the given id should handle this request.
    pub fn is_addressed_to(&self, agent_id: &str) -> bool {
        self.target_id.as_deref().is_none_or(|t| t == agent_id)
    }

    /// Build a successful response to this request.
    pub fn reply(&self, sender_id: impl Into<String>, payload: MessagePayload) -> ResponseMessage {
        ResponseMessage {
            id: new_message_id(),
            sender_id: sender_id.into(),
            request_id: self.id.clone(),
            success: true,
            payload,
            error: None,
        }
    }

    /// Build a failed response to this request.
    pub fn reply_error(
        &self,
        sender_id: impl Into<String>,
        error: impl Into<String>,
    ) -> ResponseMessage {
        let error = error.into();
        ResponseMessage {
            id: new_message_id(),
            sender_id: sender_id.into(),
            request_id: self.id.clone(),
            success: false,
            payload: MessagePayload::error("request_failed", error.clone()),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub id: String,
    pub sender_id: String,
    pub request_id: String,
    pub success: bool,
    pub payload: MessagePayload,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub sender_id: String,
    pub event_type: String,
    pub payload: MessagePayload,
}

impl EventMessage {
    pub fn new(
        sender_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: MessagePayload,
    ) -> Self {
        Self {
            id: new_message_id(),
            sender_id: sender_id.into(),
            event_type: event_type.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckMessage {
    pub id: String,
    pub sender_id: String,
    pub original_message_id: String,
    pub status: AckStatus,
}

impl AckMessage {
    pub fn new(
        sender_id: impl Into<String>,
        original_message_id: impl Into<String>,
        status: AckStatus,
    ) -> Self {
        Self {
            id: new_message_id(),
            sender_id: sender_id.into(),
            original_message_id: original_message_id.into(),
            status,
        }
    }
}

/// A message on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentMessage {
    Request(RequestMessage),
    Response(ResponseMessage),
    Event(EventMessage),
    Ack(AckMessage),
}

impl AgentMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            AgentMessage::Request(_) => MessageKind::Request,
            AgentMessage::Response(_) => MessageKind::Response,
            AgentMessage::Event(_) => MessageKind::Event,
            AgentMessage::Ack(_) => MessageKind::Ack,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            AgentMessage::Request(m) => &m.id,
            AgentMessage::Response(m) => &m.id,
            AgentMessage::Event(m) => &m.id,
            AgentMessage::Ack(m) => &m.id,
        }
    }

    pub fn sender_id(&self) -> &str {
        match self {
            AgentMessage::Request(m) => &m.sender_id,
            AgentMessage::Response(m) => &m.sender_id,
            AgentMessage::Event(m) => &m.sender_id,
            AgentMessage::Ack(m) => &m.sender_id,
        }
    }

    /// Payload, for the kinds that carry one.
    pub fn payload(&self) -> Option<&MessagePayload> {
        match self {
            AgentMessage::Request(m) => Some(&m.payload),
            AgentMessage::Response(m) => Some(&m.payload),
            AgentMessage::Event(m) => Some(&m.payload),
            AgentMessage::Ack(_) => None,
        }
    }

    /// The request `message_type` or event `event_type`, if any.
    pub fn topic(&self) -> Option<&str> {
        match self {
            AgentMessage::Request(m) => Some(&m.message_type),
            AgentMessage::Event(m) => Some(&m.event_type),
            _ => None,
        }
    }
}

impl From<RequestMessage> for AgentMessage {
    fn from(m: RequestMessage) -> Self {
        AgentMessage::Request(m)
    }
}

impl From<ResponseMessage> for AgentMessage {
    fn from(m: ResponseMessage) -> Self {
        AgentMessage::Response(m)
    }
}

impl From<EventMessage> for AgentMessage {
    fn from(m: EventMessage) -> Self {
        AgentMessage::Event(m)
    }
}

impl From<AckMessage> for AgentMessage {
    fn from(m: AckMessage) -> Self {
        AgentMessage::Ack(m)
    }
}

/// A message shape that can be extracted from an [`AgentMessage`].
///
/// Typed subscriptions use [`TypedMessage::KIND`] to filter on the static
/// tag instead of inspecting values at run time.
pub trait TypedMessage: Sized + Send + 'static {
    /// Tag to filter on; `None` accepts every kind.
    const KIND: Option<MessageKind>;

    fn from_message(message: AgentMessage) -> Option<Self>;

    /// Borrowing view, used to run filters before a message is delivered.
    fn from_ref(message: &AgentMessage) -> Option<&Self>;
}

impl TypedMessage for AgentMessage {
    const KIND: Option<MessageKind> = None;

    fn from_message(message: AgentMessage) -> Option<Self> {
        Some(message)
    }

    fn from_ref(message: &AgentMessage) -> Option<&Self> {
        Some(message)
    }
}

macro_rules! typed_message {
    ($ty:ty, $variant:ident) => {
        impl TypedMessage for $ty {
            const KIND: Option<MessageKind> = Some(MessageKind::$variant);

            fn from_message(message: AgentMessage) -> Option<Self> {
                match message {
                    AgentMessage::$variant(m) => Some(m),
                    _ => None,
                }
            }

            fn from_ref(message: &AgentMessage) -> Option<&Self> {
                match message {
                    AgentMessage::$variant(m) => Some(m),
                    _ => None,
                }
            }
        }
    };
}

typed_message!(RequestMessage, Request);
typed_message!(ResponseMessage, Response);
typed_message!(EventMessage, Event);
typed_message!(AckMessage, Ack);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_references_request() {
        let req = RequestMessage::new("orchestrator", "code.analyze", MessagePayload::text("x"));
        let resp = req.reply("analyzer", MessagePayload::text("ok"));
        assert_eq!(resp.request_id, req.id);
        assert!(resp.success);

        let failed = req.reply_error("analyzer", "no capacity");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("no capacity"));
    }

    #[test]
    fn test_addressing() {
        let broadcast = RequestMessage::new("a", "t", MessagePayload::default());
        assert!(broadcast.is_addressed_to("anyone"));

        let targeted = broadcast.clone().with_target("b");
        assert!(targeted.is_addressed_to("b"));
        assert!(!targeted.is_addressed_to("c"));
    }

    #[test]
    fn test_typed_extraction() {
        let event: AgentMessage =
            EventMessage::new("registry", event_types::AGENT_SHUTDOWN, MessagePayload::default())
                .into();
        assert_eq!(event.kind(), MessageKind::Event);
        assert_eq!(event.topic(), Some(event_types::AGENT_SHUTDOWN));
        assert!(RequestMessage::from_message(event.clone()).is_none());
        assert!(EventMessage::from_message(event).is_some());
    }

    #[test]
    fn test_message_serde_tag() {
        let ack: AgentMessage = AckMessage::new("bus", "m-1", AckStatus::Received).into();
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["kind"], "ack");
        assert_eq!(json["status"], "RECEIVED");
    }
}
