//! Dry-run tool agent.
//!
//! [`EchoToolAgent`] succeeds on every step it can handle and reports back
//! what it was asked to do. `conductor run` registers one per agent type so a
//! plan can be walked end to end without real analyzers.

use async_trait::async_trait;
use conductor_application::{Agent, AgentError, ToolAgent};
use conductor_domain::{
    AgentCapabilities, AgentRequest, AgentResponse, ExecutionContext, MessagePayload, PlanStep,
    StepResult, agent_types,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub struct EchoToolAgent {
    id: String,
    agent_type: String,
    message_types: BTreeSet<String>,
    disposed: AtomicBool,
}

impl EchoToolAgent {
    /// Agent with id `{agent_type}-echo`, answering `{agent_type}.execute` requests.
    pub fn new(agent_type: impl Into<String>) -> Self {
        let agent_type = agent_type.into();
        Self {
            id: format!("{}-echo", agent_type),
            message_types: BTreeSet::from([format!("{}.execute", agent_type)]),
            agent_type,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_message_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.message_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// One agent per known agent type.
    pub fn fleet() -> Vec<Self> {
        agent_types::ALL.iter().map(|t| Self::new(*t)).collect()
    }

    fn ensure_live(&self) -> Result<(), AgentError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(AgentError::Disposed);
        }
        Ok(())
    }
}

#[async_trait]
impl Agent for EchoToolAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> AgentCapabilities {
        AgentCapabilities::default().with_tool(self.agent_type.clone())
    }

    async fn ask(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        self.ensure_live()?;
        let echoed = match &request.payload {
            MessagePayload::Text { content } => format!("[{}] {}", self.id, content),
            other => format!("[{}] received {} payload", self.id, other.variant_name()),
        };
        Ok(AgentResponse::success(MessagePayload::text(echoed)))
    }

    async fn dispose(&self) -> Result<(), AgentError> {
        self.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ToolAgent for EchoToolAgent {
    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    fn tool_capabilities(&self) -> BTreeSet<String> {
        BTreeSet::from([self.agent_type.clone(), "dry_run".to_string()])
    }

    fn supported_message_types(&self) -> BTreeSet<String> {
        self.message_types.clone()
    }

    async fn execute_step(
        &self,
        step: &PlanStep,
        context: &ExecutionContext,
    ) -> Result<StepResult, AgentError> {
        self.ensure_live()?;
        debug!(agent = %self.id, step = %step.id, "Dry-run step");

        let mut output = Map::new();
        output.insert("agent".to_string(), Value::String(self.id.clone()));
        output.insert("title".to_string(), Value::String(step.title.clone()));
        output.insert("input".to_string(), Value::Object(step.input.clone()));
        output.insert(
            "summary".to_string(),
            Value::String(format!(
                "{} for '{}' (dry run)",
                step.title, context.original_request
            )),
        );
        Ok(StepResult::success(output).with_metadata("dry_run", true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_step_echoes_step() {
        let agent = EchoToolAgent::new(agent_types::BUG_DETECTOR);
        let step = PlanStep::new("bug_detector_1", agent_types::BUG_DETECTOR, "Detect bugs")
            .with_input("request", "fix it");
        let result = agent
            .execute_step(&step, &ExecutionContext::new("fix it"))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output["agent"], "bug_detector-echo");
        assert_eq!(result.output["title"], "Detect bugs");
        assert_eq!(result.output["input"]["request"], "fix it");
        assert_eq!(result.metadata["dry_run"], true);
    }

    #[tokio::test]
    async fn test_ask_echoes_text() {
        let agent = EchoToolAgent::new("documentation").with_id("doc");
        let response = agent.ask(AgentRequest::text("documentation.execute", "hi")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.payload.as_text(), Some("[doc] hi"));
    }

    #[tokio::test]
    async fn test_disposed_agent_refuses_work() {
        let agent = EchoToolAgent::new("code_fixer");
        agent.dispose().await.unwrap();
        let err = agent.ask(AgentRequest::text("x", "y")).await.unwrap_err();
        assert_eq!(err, AgentError::Disposed);
    }

    #[test]
    fn test_fleet_covers_every_agent_type() {
        let fleet = EchoToolAgent::fleet();
        assert_eq!(fleet.len(), agent_types::ALL.len());
        assert!(fleet.iter().all(|a| a.supported_message_types().len() == 1));
        assert!(fleet[0].can_handle(&PlanStep::new("s", agent_types::ALL[0], "t")));
    }
}
