//! Progress notification port
//!
//! Defines the events the orchestrator emits while processing a request.

use serde::{Deserialize, Serialize};

/// Step counts reported at the end of a run.
///
/// SKIPPED steps are counted on their own and never as successful.
/// Steps that never became ready because a dependency failed are `blocked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_tasks: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    pub skipped_tasks: usize,
    pub blocked_tasks: usize,
    pub duration_ms: u64,
}

impl ExecutionSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed_tasks == 0 && self.blocked_tasks == 0
    }
}

/// Progress event, each with human-readable `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    PlanningComplete {
        content: String,
        plan_id: String,
        step_count: usize,
        duration_ms: u64,
    },
    TaskStarted {
        content: String,
        plan_id: String,
        step_id: String,
        agent_type: String,
    },
    TaskComplete {
        content: String,
        plan_id: String,
        step_id: String,
        agent_type: String,
        success: bool,
        error: Option<String>,
        duration_ms: u64,
    },
    AllComplete {
        content: String,
        success: bool,
        summary: ExecutionSummary,
    },
    Error {
        content: String,
        error: String,
        duration_ms: u64,
    },
}

impl ProgressEvent {
    pub fn content(&self) -> &str {
        match self {
            ProgressEvent::PlanningComplete { content, .. }
            | ProgressEvent::TaskStarted { content, .. }
            | ProgressEvent::TaskComplete { content, .. }
            | ProgressEvent::AllComplete { content, .. }
            | ProgressEvent::Error { content, .. } => content,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProgressEvent::Error { .. })
    }
}

/// Callback for progress updates
///
/// Implementations live in the presentation layer. Any
/// `Fn(&ProgressEvent)` closure is a listener.
pub trait ProgressListener: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// No-op listener for when progress reporting is not needed
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Listener that forwards every event to each delegate, in order.
///
/// Borrows its delegates so owned and borrowed listeners compose without
/// wrapper types.
pub struct CompositeProgress<'a> {
    delegates: Vec<&'a dyn ProgressListener>,
}

impl<'a> CompositeProgress<'a> {
    pub fn new(delegates: Vec<&'a dyn ProgressListener>) -> Self {
        Self { delegates }
    }

    pub fn with(mut self, delegate: &'a dyn ProgressListener) -> Self {
        self.delegates.push(delegate);
        self
    }
}

impl ProgressListener for CompositeProgress<'_> {
    fn on_event(&self, event: &ProgressEvent) {
        for delegate in &self.delegates {
            delegate.on_event(event);
        }
    }
}
