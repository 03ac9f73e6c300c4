//! Orchestrator use case
//!
//! Top-level control loop: plan once, then repeatedly pick the first ready
//! step, dispatch it to the agent the resolver finds for it, record the
//! result and let the planner adapt the plan, until nothing is runnable.
//!
//! Step failures are recorded and the loop carries on with independent
//! branches. Only a planning failure ends a request before any step runs.

use crate::config::OrchestratorParams;
use crate::ports::agent::AgentError;
use crate::ports::planner::{Planner, PlanningError};
use crate::ports::progress::{ExecutionSummary, NoProgress, ProgressEvent, ProgressListener};
use crate::ports::resolver::AgentResolver;
use conductor_domain::{
    ComplexitySignal, ExecutionContext, ExecutionPlan, PlanState, PlanStep, PlanningContext,
    StepResult, StepResults, StepStatus,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("Cancelled")]
    Cancelled,

    #[error("Iteration limit of {0} steps reached")]
    IterationLimit(usize),
}

/// Input for one orchestrated request
#[derive(Debug, Clone)]
pub struct OrchestratorInput {
    pub request: String,
    pub complexity: ComplexitySignal,
    pub context: PlanningContext,
}

impl OrchestratorInput {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            complexity: ComplexitySignal::default(),
            context: PlanningContext::default(),
        }
    }

    pub fn with_complexity(mut self, complexity: ComplexitySignal) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_context(mut self, context: PlanningContext) -> Self {
        self.context = context;
        self
    }
}

/// Outcome of [`Orchestrator::process`]
#[derive(Debug, Clone, Serialize)]
pub struct FinalResponse {
    pub success: bool,
    pub content: String,
    /// Absent only when planning failed
    pub plan: Option<ExecutionPlan>,
    pub results: StepResults,
    pub summary: ExecutionSummary,
    pub error: Option<String>,
}

pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    resolver: Arc<dyn AgentResolver>,
    params: OrchestratorParams,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        resolver: Arc<dyn AgentResolver>,
        params: OrchestratorParams,
    ) -> Self {
        Self {
            planner,
            resolver,
            params,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process a request with default (no-op) progress
    pub async fn run(&self, input: OrchestratorInput) -> FinalResponse {
        self.process(input, &NoProgress).await
    }

    /// Process a request, reporting progress to `listener`.
    ///
    /// Never returns an error: failures surface as an `Error` event and a
    /// response with `success == false`.
    pub async fn process(
        &self,
        input: OrchestratorInput,
        listener: &dyn ProgressListener,
    ) -> FinalResponse {
        let started = Instant::now();
        info!(request = %input.request, "Processing request");

        let mut plan = match self
            .planner
            .create_plan(&input.request, &input.complexity, &input.context)
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                let error = OrchestratorError::from(e).to_string();
                warn!(error = %error, "Planning failed");
                listener.on_event(&ProgressEvent::Error {
                    content: format!("Could not plan request: {error}"),
                    error: error.clone(),
                    duration_ms: elapsed_ms(started),
                });
                return FinalResponse {
                    success: false,
                    content: String::new(),
                    plan: None,
                    results: StepResults::new(),
                    summary: ExecutionSummary::default(),
                    error: Some(error),
                };
            }
        };

        listener.on_event(&ProgressEvent::PlanningComplete {
            content: format!(
                "Planned {} steps for a {} request",
                plan.steps.len(),
                plan.analysis.task_type
            ),
            plan_id: plan.id.to_string(),
            step_count: plan.steps.len(),
            duration_ms: elapsed_ms(started),
        });

        let mut context = ExecutionContext::new(input.request.as_str()).with_plan_id(plan.id.clone());
        if let Some(root) = &input.context.project_root {
            context = context.with_project_root(root.as_str());
        }

        let mut results = StepResults::new();
        plan.set_state(PlanState::Running);

        let outcome = self
            .run_loop(&mut plan, &mut results, &context, listener)
            .await;

        let mut summary = summarize(&plan);
        summary.duration_ms = elapsed_ms(started);
        let state = if summary.all_succeeded() && outcome.is_ok() {
            PlanState::Completed
        } else {
            PlanState::Failed
        };
        plan.set_state(state);

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                let error = e.to_string();
                warn!(plan = %plan.id, error = %error, "Run aborted");
                listener.on_event(&ProgressEvent::Error {
                    content: format!("Run aborted: {error}"),
                    error: error.clone(),
                    duration_ms: elapsed_ms(started),
                });
                Some(error)
            }
        };

        let content = aggregate_content(&plan, &results, &summary);
        let success = state == PlanState::Completed;
        listener.on_event(&ProgressEvent::AllComplete {
            content: content.clone(),
            success,
            summary: summary.clone(),
        });

        info!(
            plan = %plan.id,
            state = %state,
            total = summary.total_tasks,
            succeeded = summary.successful_tasks,
            failed = summary.failed_tasks,
            "Request processed"
        );

        FinalResponse {
            success,
            content,
            plan: Some(plan),
            results,
            summary,
            error,
        }
    }

    async fn run_loop(
        &self,
        plan: &mut ExecutionPlan,
        results: &mut StepResults,
        context: &ExecutionContext,
        listener: &dyn ProgressListener,
    ) -> Result<(), OrchestratorError> {
        let mut executed = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                return Err(OrchestratorError::Cancelled);
            }

            *plan = self.planner.resolve_conditionals(plan, context, results);
            record_skipped(plan, results);

            let Some(step) = plan.next_ready_step().cloned() else {
                debug!(plan = %plan.id, "No ready steps left");
                return Ok(());
            };
            if executed >= self.params.max_iterations {
                return Err(OrchestratorError::IterationLimit(self.params.max_iterations));
            }
            executed += 1;

            plan.set_step_status(&step.id, StepStatus::Running, None);
            listener.on_event(&ProgressEvent::TaskStarted {
                content: format!("Running {} ({})", step.id, step.agent_type),
                plan_id: plan.id.to_string(),
                step_id: step.id.to_string(),
                agent_type: step.agent_type.clone(),
            });
            let started = Instant::now();

            let result = tokio::select! {
                _ = self.cancel.cancelled() => {
                    plan.set_step_status(&step.id, StepStatus::Failed, Some("cancelled".to_string()));
                    return Err(OrchestratorError::Cancelled);
                }
                result = self.execute_step(&step, context) => result,
            };

            let status = if result.success {
                StepStatus::Completed
            } else {
                StepStatus::Failed
            };
            plan.set_step_status(&step.id, status, result.error.clone());

            listener.on_event(&ProgressEvent::TaskComplete {
                content: step_content(&step, &result),
                plan_id: plan.id.to_string(),
                step_id: step.id.to_string(),
                agent_type: step.agent_type.clone(),
                success: result.success,
                error: result.error.clone(),
                duration_ms: elapsed_ms(started),
            });
            results.insert(step.id.clone(), result);

            *plan = self
                .planner
                .modify_plan_based_on_results(plan, results, context);
        }
    }

    /// Resolve, validate and run one step. Every failure becomes a failed result.
    async fn execute_step(&self, step: &PlanStep, context: &ExecutionContext) -> StepResult {
        let Some(agent) = self.resolver.resolve(step) else {
            warn!(step = %step.id, agent_type = %step.agent_type, "No agent available");
            return StepResult::failure(format!(
                "No agent available for type '{}'",
                step.agent_type
            ));
        };

        let validation = agent.validate_input(&step.input);
        if !validation.is_valid {
            return StepResult::failure(AgentError::Validation(validation.errors).to_string());
        }

        debug!(step = %step.id, agent = agent.id(), "Executing step");
        let started = Instant::now();
        let timeout = self.params.step_timeout;
        let result = match tokio::time::timeout(timeout, agent.execute_step(step, context)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => StepResult::failure(e.to_string()),
            Err(_) => StepResult::failure(AgentError::Timeout(timeout.as_millis() as u64).to_string()),
        };
        self.resolver
            .record_outcome(agent.id(), result.success, started.elapsed());
        result
    }
}

/// Give every SKIPPED step without a result a synthetic skip result.
fn record_skipped(plan: &ExecutionPlan, results: &mut StepResults) {
    for step in plan.steps_with_status(StepStatus::Skipped) {
        results.entry(step.id.clone()).or_insert_with(|| {
            StepResult::skipped(step.error.clone().unwrap_or_else(|| "skipped".to_string()))
        });
    }
}

fn summarize(plan: &ExecutionPlan) -> ExecutionSummary {
    ExecutionSummary {
        total_tasks: plan.steps.len(),
        successful_tasks: plan.count_status(StepStatus::Completed),
        failed_tasks: plan.count_status(StepStatus::Failed) + plan.count_status(StepStatus::Running),
        skipped_tasks: plan.count_status(StepStatus::Skipped),
        blocked_tasks: plan.count_status(StepStatus::Pending),
        duration_ms: 0,
    }
}

fn step_content(step: &PlanStep, result: &StepResult) -> String {
    match (&result.error, result.output.get("summary").and_then(|v| v.as_str())) {
        (Some(error), _) => format!("{} failed: {error}", step.title),
        (None, Some(summary)) => format!("{}: {summary}", step.title),
        (None, None) => format!("{} completed", step.title),
    }
}

fn aggregate_content(plan: &ExecutionPlan, results: &StepResults, summary: &ExecutionSummary) -> String {
    let mut lines = vec![format!(
        "{}/{} steps succeeded",
        summary.successful_tasks, summary.total_tasks
    )];
    for step in &plan.steps {
        if let Some(result) = results.get(&step.id) {
            if step.status == StepStatus::Completed {
                lines.push(format!("- {}", step_content(step, result)));
            }
        }
    }
    lines.join("\n")
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
