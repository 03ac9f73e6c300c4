//! Adapter exposing a plain [`Agent`] as a [`ToolAgent`].
//!
//! The step is sent to the wrapped agent as a single `ask` with a structured
//! payload; the answer becomes the step output.

use async_trait::async_trait;
use conductor_application::{Agent, AgentError, AgentEventStream, ToolAgent};
use conductor_domain::{
    AgentCapabilities, AgentRequest, AgentResponse, AgentSettings, ExecutionContext,
    MessagePayload, PlanStep, StepResult,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Message type used for the `ask` that carries a step.
pub const EXECUTE_STEP_MESSAGE_TYPE: &str = "execute_step";

pub struct LegacyAgentAdapter {
    inner: Arc<dyn Agent>,
    agent_type: String,
}

impl LegacyAgentAdapter {
    pub fn new(inner: Arc<dyn Agent>, agent_type: impl Into<String>) -> Self {
        Self {
            inner,
            agent_type: agent_type.into(),
        }
    }

    fn step_request(step: &PlanStep, context: &ExecutionContext) -> AgentRequest {
        let mut data = Map::new();
        data.insert("step_id".to_string(), step.id.as_str().into());
        data.insert("title".to_string(), step.title.clone().into());
        data.insert("description".to_string(), step.description.clone().into());
        data.insert("input".to_string(), Value::Object(step.input.clone()));
        data.insert(
            "request".to_string(),
            context.original_request.clone().into(),
        );
        AgentRequest::new(EXECUTE_STEP_MESSAGE_TYPE, MessagePayload::structured(data))
    }

    fn step_output(payload: MessagePayload) -> Map<String, Value> {
        match payload {
            MessagePayload::Structured { data } => data,
            MessagePayload::Text { content } => {
                let mut map = Map::new();
                map.insert("content".to_string(), Value::String(content));
                map
            }
            other => {
                let mut map = Map::new();
                map.insert(
                    "payload".to_string(),
                    serde_json::to_value(&other).unwrap_or(Value::Null),
                );
                map
            }
        }
    }
}

#[async_trait]
impl Agent for LegacyAgentAdapter {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn capabilities(&self) -> AgentCapabilities {
        self.inner.capabilities()
    }

    async fn ask(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        self.inner.ask(request).await
    }

    async fn start(&self, request: AgentRequest) -> Result<Option<AgentEventStream>, AgentError> {
        self.inner.start(request).await
    }

    async fn update_settings(&self, settings: AgentSettings) -> Result<(), AgentError> {
        self.inner.update_settings(settings).await
    }

    async fn dispose(&self) -> Result<(), AgentError> {
        self.inner.dispose().await
    }
}

#[async_trait]
impl ToolAgent for LegacyAgentAdapter {
    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    fn tool_capabilities(&self) -> BTreeSet<String> {
        self.inner.capabilities().tools.into_iter().collect()
    }

    async fn execute_step(
        &self,
        step: &PlanStep,
        context: &ExecutionContext,
    ) -> Result<StepResult, AgentError> {
        let response = self.inner.ask(Self::step_request(step, context)).await?;
        if response.success {
            Ok(StepResult::success(Self::step_output(response.payload)))
        } else {
            Ok(StepResult::failure(
                response
                    .error
                    .unwrap_or_else(|| "agent reported failure".to_string()),
            ))
        }
    }
}
