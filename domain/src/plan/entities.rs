//! Plan domain entities

use super::conditional::ConditionalStep;
use super::error::PlanError;
use super::value_objects::{PlanId, StepId};
use crate::planning::RequestAnalysis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Status of a plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    /// Waiting for dependencies or for its turn
    #[default]
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Not executed; counts as satisfied for dependents
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }

    /// Whether a dependent step may start once a dependency has this status.
    pub fn satisfies_dependency(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Skipped)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a whole plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanState {
    #[default]
    Created,
    Running,
    /// Reserved for human-in-the-loop resumption; not driven by the orchestrator
    Paused,
    Completed,
    Failed,
}

impl PlanState {
    pub fn as_str(&self) -> &str {
        match self {
            PlanState::Created => "created",
            PlanState::Running => "running",
            PlanState::Paused => "paused",
            PlanState::Completed => "completed",
            PlanState::Failed => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, PlanState::Completed | PlanState::Failed)
    }
}

impl std::fmt::Display for PlanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of work bound to one agent type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique within the owning plan
    pub id: StepId,
    pub title: String,
    pub description: String,
    /// Capability type of the tool agent expected to run this step
    pub agent_type: String,
    pub input: Map<String, Value>,
    /// Steps that must be COMPLETED or SKIPPED before this one starts
    pub dependencies: BTreeSet<StepId>,
    pub estimated_duration_ms: u64,
    pub status: StepStatus,
    /// Failure message, or skip reason for SKIPPED steps
    pub error: Option<String>,
    pub metadata: Map<String, Value>,
}

impl PlanStep {
    pub fn new(
        id: impl Into<StepId>,
        agent_type: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            agent_type: agent_type.into(),
            input: Map::new(),
            dependencies: BTreeSet::new(),
            estimated_duration_ms: 0,
            status: StepStatus::Pending,
            error: None,
            metadata: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(key.into(), value.into());
        self
    }

    pub fn with_dependency(mut self, step_id: impl Into<StepId>) -> Self {
        self.dependencies.insert(step_id.into());
        self
    }

    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = StepId>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn with_estimated_duration_ms(mut self, ms: u64) -> Self {
        self.estimated_duration_ms = ms;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// A versioned DAG of steps fulfilling one user request.
///
/// Structural changes go through
/// [`DynamicPlanModifier`](super::modifier::DynamicPlanModifier), which
/// returns a new plan with `version + 1` and leaves the input untouched.
/// Step status and plan state are run-time bookkeeping owned by the
/// orchestrator and do not change the version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: PlanId,
    pub original_request: String,
    pub analysis: RequestAnalysis,
    pub steps: Vec<PlanStep>,
    pub current_state: PlanState,
    pub version: u64,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    /// Deferred choices awaiting resolution against step results
    #[serde(skip)]
    pub conditionals: Vec<ConditionalStep>,
}

impl ExecutionPlan {
    pub fn new(original_request: impl Into<String>, analysis: RequestAnalysis) -> Self {
        Self {
            id: PlanId::generate(),
            original_request: original_request.into(),
            analysis,
            steps: Vec::new(),
            current_state: PlanState::Created,
            version: 1,
            metadata: HashMap::new(),
            created_at: Utc::now(),
            conditionals: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<PlanId>) -> Self {
        self.id = id.into();
        self
    }

    /// Append a step while assembling a plan (does not bump the version).
    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_conditional(mut self, conditional: ConditionalStep) -> Self {
        self.conditionals.push(conditional);
        self
    }

    pub fn step(&self, id: &StepId) -> Option<&PlanStep> {
        self.steps.iter().find(|s| &s.id == id)
    }

    pub fn step_index(&self, id: &StepId) -> Option<usize> {
        self.steps.iter().position(|s| &s.id == id)
    }

    pub fn contains_step(&self, id: &StepId) -> bool {
        self.step_index(id).is_some()
    }

    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    /// Whether every dependency of `deps` exists and is COMPLETED or SKIPPED.
    pub fn dependencies_satisfied<'a>(&self, deps: impl IntoIterator<Item = &'a StepId>) -> bool {
        deps.into_iter().all(|dep| {
            self.step(dep)
                .is_some_and(|s| s.status.satisfies_dependency())
        })
    }

    /// A step is ready iff it is PENDING and all its dependencies are satisfied.
    pub fn is_ready(&self, step: &PlanStep) -> bool {
        step.status == StepStatus::Pending && self.dependencies_satisfied(&step.dependencies)
    }

    pub fn ready_steps(&self) -> Vec<&PlanStep> {
        self.steps.iter().filter(|s| self.is_ready(s)).collect()
    }

    /// First ready step in list order.
    pub fn next_ready_step(&self) -> Option<&PlanStep> {
        self.steps.iter().find(|s| self.is_ready(s))
    }

    pub fn steps_with_status(&self, status: StepStatus) -> Vec<&PlanStep> {
        self.steps.iter().filter(|s| s.status == status).collect()
    }

    pub fn count_status(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// Update a step's run-time status. Returns `false` if the step is unknown.
    pub fn set_step_status(
        &mut self,
        id: &StepId,
        status: StepStatus,
        error: Option<String>,
    ) -> bool {
        match self.steps.iter_mut().find(|s| &s.id == id) {
            Some(step) => {
                step.status = status;
                step.error = error;
                true
            }
            None => false,
        }
    }

    pub fn set_state(&mut self, state: PlanState) {
        self.current_state = state;
    }

    /// Completion progress as (terminal steps, total steps)
    pub fn progress(&self) -> (usize, usize) {
        let done = self.steps.iter().filter(|s| s.status.is_terminal()).count();
        (done, self.steps.len())
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    pub fn total_estimated_duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.estimated_duration_ms).sum()
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Check step ids are unique, every dependency exists and there is no cycle.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(&step.id) {
                return Err(PlanError::DuplicateStep(step.id.clone()));
            }
        }
        for step in &self.steps {
            if let Some(dep) = step.dependencies.iter().find(|d| !seen.contains(d)) {
                return Err(PlanError::UnknownDependency {
                    step: step.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        self.check_acyclic()
    }

    /// Kahn's algorithm over the dependency edges.
    ///
    /// Dependencies on unknown steps are ignored here; `validate` reports them.
    pub fn check_acyclic(&self) -> Result<(), PlanError> {
        let ids: HashSet<&StepId> = self.steps.iter().map(|s| &s.id).collect();
        let mut in_degree: HashMap<&StepId, usize> = HashMap::new();
        let mut dependents: HashMap<&StepId, Vec<&StepId>> = HashMap::new();

        for step in &self.steps {
            let known: Vec<&StepId> = step
                .dependencies
                .iter()
                .filter(|d| ids.contains(d))
                .collect();
            in_degree.insert(&step.id, known.len());
            for dep in known {
                dependents.entry(dep).or_default().push(&step.id);
            }
        }

        let mut queue: VecDeque<&StepId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0;

        while let Some(id) = queue.pop_front() {
            visited += 1;
            for child in dependents.get(id).into_iter().flatten() {
                if let Some(d) = in_degree.get_mut(child) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if visited == in_degree.len() {
            return Ok(());
        }

        // Report the first step (in list order) left on a cycle
        let culprit = self
            .steps
            .iter()
            .find(|s| in_degree.get(&s.id).is_some_and(|d| *d > 0))
            .map(|s| s.id.clone())
            .unwrap_or_else(|| StepId::new("?"));
        Err(PlanError::CycleDetected(culprit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::{ComplexitySignal, TaskType};

    fn analysis() -> RequestAnalysis {
        RequestAnalysis::new(TaskType::General, ComplexitySignal::default())
    }

    fn chain() -> ExecutionPlan {
        ExecutionPlan::new("scan and report", analysis())
            .with_step(PlanStep::new("scan", "project_scanner", "Scan"))
            .with_step(PlanStep::new("analyze", "code_quality", "Analyze").with_dependency("scan"))
            .with_step(PlanStep::new("report", "documentation", "Report").with_dependency("analyze"))
    }

    #[test]
    fn test_step_status() {
        assert!(!StepStatus::Pending.is_terminal());
        assert!(!StepStatus::Running.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
        assert!(StepStatus::Skipped.satisfies_dependency());
        assert!(!StepStatus::Failed.satisfies_dependency());
    }

    #[test]
    fn test_new_plan_defaults() {
        let plan = chain();
        assert_eq!(plan.version, 1);
        assert_eq!(plan.current_state, PlanState::Created);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_ready_selection_respects_dependencies() {
        let mut plan = chain();
        assert_eq!(plan.next_ready_step().unwrap().id.as_str(), "scan");
        assert_eq!(plan.ready_steps().len(), 1);

        plan.set_step_status(&"scan".into(), StepStatus::Running, None);
        assert!(plan.next_ready_step().is_none());

        plan.set_step_status(&"scan".into(), StepStatus::Completed, None);
        assert_eq!(plan.next_ready_step().unwrap().id.as_str(), "analyze");
    }

    #[test]
    fn test_skipped_dependencies_make_step_ready() {
        let mut plan = ExecutionPlan::new("x", analysis())
            .with_step(PlanStep::new("a", "t", "A"))
            .with_step(PlanStep::new("b", "t", "B"))
            .with_step(
                PlanStep::new("c", "t", "C")
                    .with_dependency("a")
                    .with_dependency("b"),
            );
        plan.set_step_status(&"a".into(), StepStatus::Skipped, None);
        plan.set_step_status(&"b".into(), StepStatus::Skipped, None);

        let c = plan.step(&"c".into()).unwrap();
        assert!(plan.is_ready(c));
    }

    #[test]
    fn test_failed_dependency_blocks() {
        let mut plan = chain();
        plan.set_step_status(&"scan".into(), StepStatus::Failed, Some("boom".into()));
        assert!(plan.next_ready_step().is_none());
        assert_eq!(plan.progress(), (1, 3));
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_unknown_dependency_never_ready() {
        let plan = ExecutionPlan::new("x", analysis())
            .with_step(PlanStep::new("a", "t", "A").with_dependency("ghost"));
        assert!(plan.next_ready_step().is_none());
        assert!(matches!(
            plan.validate(),
            Err(PlanError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_cycle_detection() {
        let plan = ExecutionPlan::new("x", analysis())
            .with_step(PlanStep::new("a", "t", "A").with_dependency("c"))
            .with_step(PlanStep::new("b", "t", "B").with_dependency("a"))
            .with_step(PlanStep::new("c", "t", "C").with_dependency("b"));
        assert_eq!(plan.validate(), Err(PlanError::CycleDetected("a".into())));
    }

    #[test]
    fn test_duplicate_detection() {
        let plan = ExecutionPlan::new("x", analysis())
            .with_step(PlanStep::new("a", "t", "A"))
            .with_step(PlanStep::new("a", "t", "A again"));
        assert_eq!(plan.validate(), Err(PlanError::DuplicateStep("a".into())));
    }

    #[test]
    fn test_status_updates_keep_version() {
        let mut plan = chain();
        assert!(plan.set_step_status(&"scan".into(), StepStatus::Completed, None));
        assert!(!plan.set_step_status(&"nope".into(), StepStatus::Completed, None));
        plan.set_state(PlanState::Running);
        assert_eq!(plan.version, 1);
    }
}
