//! Agent registry entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A tool agent's entry in the registry.
///
/// Exactly one registration exists per `agent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolAgentRegistration {
    pub agent_id: String,
    pub agent_type: String,
    pub capabilities: BTreeSet<String>,
    /// Request `message_type`s the agent answers on the bus
    pub supported_message_types: BTreeSet<String>,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    /// Flips to false after a heartbeat silence window
    pub active: bool,
}

impl ToolAgentRegistration {
    pub fn new(agent_id: impl Into<String>, agent_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            capabilities: BTreeSet::new(),
            supported_message_types: BTreeSet::new(),
            registered_at: now,
            last_heartbeat: now,
            active: true,
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = String>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    pub fn with_message_types(mut self, types: impl IntoIterator<Item = String>) -> Self {
        self.supported_message_types.extend(types);
        self
    }

    pub fn supports_message_type(&self, message_type: &str) -> bool {
        self.supported_message_types.contains(message_type)
    }
}

/// Per-agent execution counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub tasks_executed: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub total_execution_ms: u64,
    pub messages_handled: u64,
    pub last_execution_at: Option<DateTime<Utc>>,
}

impl AgentMetrics {
    pub fn record_execution(&mut self, success: bool, duration_ms: u64) {
        self.tasks_executed += 1;
        if success {
            self.tasks_succeeded += 1;
        } else {
            self.tasks_failed += 1;
        }
        self.total_execution_ms += duration_ms;
        self.last_execution_at = Some(Utc::now());
    }

    pub fn record_message(&mut self) {
        self.messages_handled += 1;
    }

    pub fn average_execution_ms(&self) -> f64 {
        if self.tasks_executed == 0 {
            return 0.0;
        }
        self.total_execution_ms as f64 / self.tasks_executed as f64
    }

    pub fn success_rate(&self) -> f64 {
        if self.tasks_executed == 0 {
            return 0.0;
        }
        self.tasks_succeeded as f64 / self.tasks_executed as f64
    }
}
