//! Registry of live tool agents.
//!
//! Owns agent lifecycle (registration, bus participation, disposal), tracks
//! liveness through heartbeats and keeps per-agent execution metrics.
//!
//! Liveness is measured on the monotonic clock:
//!
//! | Silence longer than | Effect | Applied by |
//! |---------------------|--------|------------|
//! | `inactive_after` | `active = false` | [`ToolAgentRegistry::check_heartbeats`] |
//! | `remove_after` (while inactive) | unregistered | [`ToolAgentRegistry::cleanup_inactive`] |

use super::participant::BusParticipant;
use crate::bus::{BusError, MessageBus};
use chrono::Utc;
use conductor_application::{Agent, AgentResolver, RegistryParams, ToolAgent};
use conductor_domain::{
    AgentMetrics, EventMessage, MessagePayload, PlanStep, ToolAgentRegistration, event_types,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sender id used for lifecycle events published by the registry.
pub const REGISTRY_SENDER_ID: &str = "agent-registry";

struct AgentEntry {
    agent: Arc<dyn ToolAgent>,
    registration: ToolAgentRegistration,
    metrics: AgentMetrics,
    last_seen: Instant,
    participant: BusParticipant,
}

pub struct ToolAgentRegistry {
    bus: Arc<MessageBus>,
    params: RegistryParams,
    /// Ordered by agent id so resolution ties are deterministic.
    agents: RwLock<BTreeMap<String, AgentEntry>>,
    monitor: CancellationToken,
    monitor_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ToolAgentRegistry {
    pub fn new(bus: Arc<MessageBus>, params: RegistryParams) -> Arc<Self> {
        Arc::new(Self {
            bus,
            params,
            agents: RwLock::new(BTreeMap::new()),
            monitor: CancellationToken::new(),
            monitor_tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Register an agent and connect it to the bus.
    ///
    /// Returns `false` when an agent with the same id was already registered;
    /// the old agent is shut down and replaced.
    pub async fn register(self: &Arc<Self>, agent: Arc<dyn ToolAgent>) -> Result<bool, BusError> {
        let agent_id = agent.id().to_string();

        let replaced = self.contains(&agent_id);
        if replaced {
            warn!(agent = %agent_id, "Agent already registered, replacing it");
            self.unregister(&agent_id).await;
        }

        let participant = BusParticipant::spawn(&self.bus, Arc::clone(&agent), Arc::downgrade(self))?;
        let registration = ToolAgentRegistration::new(agent_id.clone(), agent.agent_type())
            .with_capabilities(agent.tool_capabilities())
            .with_message_types(agent.supported_message_types());
        let payload = Self::agent_info(&registration);

        {
            let mut agents = self.write_agents();
            agents.insert(
                agent_id.clone(),
                AgentEntry {
                    agent,
                    registration,
                    metrics: AgentMetrics::default(),
                    last_seen: Instant::now(),
                    participant,
                },
            );
        }

        self.announce(event_types::AGENT_INITIALIZED, payload);
        info!(agent = %agent_id, "Registered agent");
        Ok(!replaced)
    }

    /// Shut an agent down and forget it.
    ///
    /// The agent is always removed, even when its `dispose` fails.
    pub async fn unregister(&self, agent_id: &str) -> bool {
        let agent = {
            let agents = self.read_agents();
            let Some(entry) = agents.get(agent_id) else {
                return false;
            };
            entry.participant.cancel();
            Arc::clone(&entry.agent)
        };

        if let Err(e) = agent.dispose().await {
            warn!(agent = %agent_id, error = %e, "Agent dispose failed, removing anyway");
        }

        let removed = self.write_agents().remove(agent_id);
        let Some(entry) = removed else {
            // Lost a race with a concurrent unregister
            return false;
        };

        self.announce(
            event_types::AGENT_SHUTDOWN,
            Self::agent_info(&entry.registration),
        );
        info!(agent = %agent_id, "Unregistered agent");
        true
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn ToolAgent>> {
        self.read_agents()
            .get(agent_id)
            .map(|entry| Arc::clone(&entry.agent))
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.read_agents().contains_key(agent_id)
    }

    pub fn registration(&self, agent_id: &str) -> Option<ToolAgentRegistration> {
        self.read_agents()
            .get(agent_id)
            .map(|entry| entry.registration.clone())
    }

    /// Every registration, ordered by agent id.
    pub fn registrations(&self) -> Vec<ToolAgentRegistration> {
        self.read_agents()
            .values()
            .map(|entry| entry.registration.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_agents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn agents_by_type(&self, agent_type: &str) -> Vec<Arc<dyn ToolAgent>> {
        self.read_agents()
            .values()
            .filter(|entry| entry.registration.agent_type == agent_type)
            .map(|entry| Arc::clone(&entry.agent))
            .collect()
    }

    pub fn agents_for_message_type(&self, message_type: &str) -> Vec<Arc<dyn ToolAgent>> {
        self.read_agents()
            .values()
            .filter(|entry| entry.registration.supports_message_type(message_type))
            .map(|entry| Arc::clone(&entry.agent))
            .collect()
    }

    pub fn is_active(&self, agent_id: &str) -> bool {
        self.read_agents()
            .get(agent_id)
            .is_some_and(|entry| entry.registration.active)
    }

    /// Flip an agent's active flag. Activating also counts as a heartbeat.
    pub fn set_active(&self, agent_id: &str, active: bool) -> bool {
        let mut agents = self.write_agents();
        let Some(entry) = agents.get_mut(agent_id) else {
            return false;
        };
        entry.registration.active = active;
        if active {
            entry.last_seen = Instant::now();
            entry.registration.last_heartbeat = Utc::now();
        }
        debug!(agent = %agent_id, active, "Set agent activity");
        true
    }

    /// Record a sign of life; re-activates an inactive agent.
    pub fn heartbeat(&self, agent_id: &str) -> bool {
        let mut agents = self.write_agents();
        let Some(entry) = agents.get_mut(agent_id) else {
            return false;
        };
        Self::mark_seen(agent_id, entry);
        true
    }

    pub fn metrics(&self, agent_id: &str) -> Option<AgentMetrics> {
        self.read_agents()
            .get(agent_id)
            .map(|entry| entry.metrics.clone())
    }

    /// Count a finished step. A completed execution also counts as a heartbeat.
    pub fn record_execution(&self, agent_id: &str, success: bool, duration: Duration) {
        if let Some(entry) = self.write_agents().get_mut(agent_id) {
            entry
                .metrics
                .record_execution(success, duration.as_millis() as u64);
            Self::mark_seen(agent_id, entry);
        }
    }

    pub(crate) fn record_message(&self, agent_id: &str) {
        if let Some(entry) = self.write_agents().get_mut(agent_id) {
            entry.metrics.record_message();
        }
    }

    /// Mark agents silent for longer than `inactive_after` as inactive.
    ///
    /// Returns the ids that changed state in this sweep.
    pub fn check_heartbeats(&self) -> Vec<String> {
        let window = self.params.inactive_after;
        let mut flipped = Vec::new();
        let mut agents = self.write_agents();
        for (agent_id, entry) in agents.iter_mut() {
            if entry.registration.active && entry.last_seen.elapsed() > window {
                entry.registration.active = false;
                warn!(
                    agent = %agent_id,
                    silent_ms = entry.last_seen.elapsed().as_millis() as u64,
                    "Agent missed its heartbeat window, marking inactive"
                );
                flipped.push(agent_id.clone());
            }
        }
        flipped
    }

    /// Unregister inactive agents silent for longer than `remove_after`.
    pub async fn cleanup_inactive(&self) -> Vec<String> {
        let window = self.params.remove_after;
        let stale: Vec<String> = self
            .read_agents()
            .iter()
            .filter(|(_, entry)| !entry.registration.active && entry.last_seen.elapsed() > window)
            .map(|(agent_id, _)| agent_id.clone())
            .collect();

        let mut removed = Vec::with_capacity(stale.len());
        for agent_id in stale {
            if self.unregister(&agent_id).await {
                removed.push(agent_id);
            }
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "Removed inactive agents");
        }
        removed
    }

    /// Spawn the heartbeat monitor, the cleanup sweep and the listener for
    /// `AGENT_HEARTBEAT` events. Calling it twice has no effect.
    pub fn start_monitoring(self: &Arc<Self>) {
        let mut tasks = self
            .monitor_tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !tasks.is_empty() || self.monitor.is_cancelled() {
            return;
        }

        let heartbeat_interval = self.params.heartbeat_interval.max(Duration::from_millis(1));
        let cleanup_interval = self.params.cleanup_interval.max(Duration::from_millis(1));

        {
            let registry = Arc::clone(self);
            let cancel = self.monitor.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(heartbeat_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            registry.check_heartbeats();
                        }
                    }
                }
                debug!("Heartbeat monitor stopped");
            }));
        }

        {
            let registry = Arc::clone(self);
            let cancel = self.monitor.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(cleanup_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            registry.cleanup_inactive().await;
                        }
                    }
                }
                debug!("Cleanup sweep stopped");
            }));
        }

        match self
            .bus
            .subscribe_filtered::<EventMessage, _>(|e| e.event_type == event_types::AGENT_HEARTBEAT)
        {
            Ok(mut heartbeats) => {
                let registry = Arc::clone(self);
                let cancel = self.monitor.clone();
                tasks.push(tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            next = heartbeats.recv() => match next {
                                Some(event) => {
                                    registry.heartbeat(&event.sender_id);
                                }
                                None => break,
                            },
                        }
                    }
                }));
            }
            Err(e) => warn!(error = %e, "Could not listen for heartbeat events"),
        }

        info!(
            heartbeat_ms = heartbeat_interval.as_millis() as u64,
            cleanup_ms = cleanup_interval.as_millis() as u64,
            "Started registry monitoring"
        );
    }

    /// Stop the background loops and unregister every agent.
    pub async fn shutdown(&self) {
        self.monitor.cancel();
        let tasks: Vec<JoinHandle<()>> = {
            let mut tasks = self
                .monitor_tasks
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            tasks.drain(..).collect()
        };
        for task in tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "Monitor task ended abnormally");
            }
        }
        self.clear().await;
    }

    /// Unregister every agent.
    pub async fn clear(&self) {
        let ids: Vec<String> = self.read_agents().keys().cloned().collect();
        for agent_id in ids {
            self.unregister(&agent_id).await;
        }
    }

    fn mark_seen(agent_id: &str, entry: &mut AgentEntry) {
        entry.last_seen = Instant::now();
        entry.registration.last_heartbeat = Utc::now();
        if !entry.registration.active {
            entry.registration.active = true;
            info!(agent = %agent_id, "Agent active again");
        }
    }

    fn announce(&self, event_type: &str, payload: MessagePayload) {
        let event = EventMessage::new(REGISTRY_SENDER_ID, event_type, payload);
        if let Err(e) = self.bus.publish(event) {
            debug!(event_type, error = %e, "Could not publish lifecycle event");
        }
    }

    fn agent_info(registration: &ToolAgentRegistration) -> MessagePayload {
        MessagePayload::AgentInfo {
            agent_id: registration.agent_id.clone(),
            agent_type: registration.agent_type.clone(),
            capabilities: registration.capabilities.iter().cloned().collect(),
        }
    }

    fn read_agents(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, AgentEntry>> {
        self.agents.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_agents(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, AgentEntry>> {
        self.agents.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl AgentResolver for ToolAgentRegistry {
    fn resolve(&self, step: &PlanStep) -> Option<Arc<dyn ToolAgent>> {
        let agents = self.read_agents();
        let active = || agents.values().filter(|entry| entry.registration.active);

        active()
            .find(|entry| {
                entry.registration.agent_type == step.agent_type && entry.agent.can_handle(step)
            })
            .or_else(|| active().find(|entry| entry.agent.can_handle(step)))
            .map(|entry| Arc::clone(&entry.agent))
    }

    fn available_agent_types(&self) -> BTreeSet<String> {
        self.read_agents()
            .values()
            .filter(|entry| entry.registration.active)
            .map(|entry| entry.registration.agent_type.clone())
            .collect()
    }

    fn record_outcome(&self, agent_id: &str, success: bool, duration: Duration) {
        self.record_execution(agent_id, success, duration);
    }
}
