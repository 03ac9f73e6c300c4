//! Bridge between a registered agent and the message bus.

use super::ToolAgentRegistry;
use crate::bus::{BusError, MessageBus};
use conductor_application::{Agent, ToolAgent};
use conductor_domain::{AgentRequest, RequestMessage};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Task answering bus requests on behalf of one agent.
///
/// It receives every [`RequestMessage`] whose `message_type` the agent
/// supports and whose target is absent or the agent itself, answers through
/// [`Agent::ask`](conductor_application::Agent::ask) and reports liveness to
/// the registry. Agents that support no message type get an idle participant.
pub struct BusParticipant {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl BusParticipant {
    pub(crate) fn spawn(
        bus: &Arc<MessageBus>,
        agent: Arc<dyn ToolAgent>,
        registry: Weak<ToolAgentRegistry>,
    ) -> Result<Self, BusError> {
        let token = CancellationToken::new();
        let message_types = agent.supported_message_types();
        if message_types.is_empty() {
            return Ok(Self {
                token,
                handle: None,
            });
        }

        let agent_id = agent.id().to_string();
        let mut requests = {
            let agent_id = agent_id.clone();
            bus.subscribe_filtered::<RequestMessage, _>(move |request| {
                message_types.contains(&request.message_type) && request.is_addressed_to(&agent_id)
            })?
        };

        let bus = Arc::clone(bus);
        let cancel = token.clone();
        let handle = tokio::spawn(async move {
            loop {
                let request = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = requests.recv() => match next {
                        Some(request) => request,
                        None => break,
                    },
                };

                if let Some(registry) = registry.upgrade() {
                    registry.heartbeat(&agent_id);
                    registry.record_message(&agent_id);
                }

                trace!(agent = %agent_id, request = %request.id, "Handling bus request");
                let response = match agent.ask(AgentRequest::from(&request)).await {
                    Ok(answer) if answer.success => request.reply(&agent_id, answer.payload),
                    Ok(answer) => request.reply_error(
                        &agent_id,
                        answer.error.unwrap_or_else(|| "request failed".to_string()),
                    ),
                    Err(e) => request.reply_error(&agent_id, e.to_string()),
                };
                if let Err(e) = bus.publish(response) {
                    debug!(agent = %agent_id, request = %request.id, error = %e, "Could not publish response");
                }
            }
            debug!(agent = %agent_id, "Bus participant stopped");
        });

        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for BusParticipant {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
