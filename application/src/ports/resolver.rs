//! Agent resolution port
//!
//! The orchestrator finds the agent for a step through this port. The
//! infrastructure registry implements it.

use super::agent::ToolAgent;
use conductor_domain::PlanStep;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub trait AgentResolver: Send + Sync {
    /// Active agent able to run `step`, if any
    fn resolve(&self, step: &PlanStep) -> Option<Arc<dyn ToolAgent>>;

    /// Agent types of every active agent
    fn available_agent_types(&self) -> BTreeSet<String>;

    /// Feed back the outcome of a step execution
    fn record_outcome(&self, _agent_id: &str, _success: bool, _duration: Duration) {}
}
