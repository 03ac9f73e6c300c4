//! Request planner use case
//!
//! Classifies a request and instantiates the step template menu for its
//! task type as a linear chain of steps.

use crate::ports::planner::{Planner, PlanningError};
use async_trait::async_trait;
use conductor_domain::planning::{FINAL_QUALITY_CHECK, StepTemplate, templates_for};
use conductor_domain::{
    ComplexityLevel, ComplexitySignal, ExecutionPlan, PlanStep, PlanningContext, RequestAnalysis,
    StepId, TaskType, agent_types,
};
use tracing::{debug, info};

/// Static planner: one plan per request, never adapted afterwards.
#[derive(Debug, Clone, Default)]
pub struct RequestPlanner;

impl RequestPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Build the plan synchronously; [`Planner::create_plan`] delegates here.
    pub fn build_plan(
        &self,
        request: &str,
        complexity: &ComplexitySignal,
        context: &PlanningContext,
    ) -> Result<ExecutionPlan, PlanningError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(PlanningError::EmptyRequest);
        }

        let task_type = TaskType::classify(request, complexity.task_hint);
        let templates = Self::select_templates(task_type, complexity.level, context);
        if templates.is_empty() {
            return Err(PlanningError::EmptyPlan(task_type));
        }

        let factor = complexity.level.duration_factor();
        let mut steps: Vec<PlanStep> = Vec::with_capacity(templates.len());
        for (index, template) in templates.iter().enumerate() {
            let id = StepId::new(format!("{}_{}", template.agent_type, index + 1));
            let mut step = PlanStep::new(id, template.agent_type, template.title)
                .with_description(template.description)
                .with_input("request", request)
                .with_input("task_type", task_type.as_str())
                .with_estimated_duration_ms((template.base_duration_ms as f64 * factor) as u64);
            if let Some(root) = &context.project_root {
                step = step.with_input("project_root", root.as_str());
            }
            // Chain on the previous kept step; dropped templates are bypassed
            if let Some(previous) = steps.last() {
                step = step.with_dependency(previous.id.clone());
            }
            steps.push(step);
        }

        let analysis = RequestAnalysis::new(task_type, complexity.clone()).with_summary(format!(
            "{} request ({} complexity), {} steps",
            task_type,
            complexity.level,
            steps.len()
        ));

        let mut plan = steps
            .into_iter()
            .fold(ExecutionPlan::new(request, analysis), ExecutionPlan::with_step);
        if let Some(root) = &context.project_root {
            plan.metadata
                .insert("project_root".to_string(), root.as_str().into());
        }
        plan.validate()?;

        info!(
            plan = %plan.id,
            task_type = %task_type,
            steps = plan.steps.len(),
            "Created plan"
        );
        Ok(plan)
    }

    fn select_templates(
        task_type: TaskType,
        level: ComplexityLevel,
        context: &PlanningContext,
    ) -> Vec<StepTemplate> {
        let mut templates: Vec<StepTemplate> = templates_for(task_type).to_vec();

        if level == ComplexityLevel::Complex
            && !templates
                .iter()
                .any(|t| t.agent_type == agent_types::CODE_QUALITY)
        {
            templates.push(FINAL_QUALITY_CHECK);
        }

        let before = templates.len();
        templates.retain(|t| context.allows_agent_type(t.agent_type));
        if templates.len() < before {
            debug!(
                task_type = %task_type,
                dropped = before - templates.len(),
                "Dropped steps without an available agent type"
            );
        }
        templates
    }
}

#[async_trait]
impl Planner for RequestPlanner {
    async fn create_plan(
        &self,
        request: &str,
        complexity: &ComplexitySignal,
        context: &PlanningContext,
    ) -> Result<ExecutionPlan, PlanningError> {
        self.build_plan(request, complexity, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::PlanState;

    fn ids(plan: &ExecutionPlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_bug_fix_plan_is_a_chain() {
        let plan = RequestPlanner::new()
            .create_plan(
                "Fix the crash in the parser",
                &ComplexitySignal::default(),
                &PlanningContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(plan.version, 1);
        assert_eq!(plan.current_state, PlanState::Created);
        assert_eq!(plan.analysis.task_type, TaskType::BugFix);
        assert_eq!(
            ids(&plan),
            vec!["bug_detector_1", "code_quality_2", "code_fixer_3"]
        );
        assert!(plan.steps[0].dependencies.is_empty());
        assert!(plan.steps[1].dependencies.contains(&StepId::new("bug_detector_1")));
        assert!(plan.steps[2].dependencies.contains(&StepId::new("code_quality_2")));
    }

    #[tokio::test]
    async fn test_architecture_plan() {
        let plan = RequestPlanner::new()
            .create_plan(
                "Describe the architecture",
                &ComplexitySignal::default(),
                &PlanningContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            ids(&plan),
            vec![
                "project_scanner_1",
                "architecture_analyzer_2",
                "code_quality_3",
                "documentation_4"
            ]
        );
    }

    #[test]
    fn test_empty_request_fails() {
        let err = RequestPlanner::new()
            .build_plan("   ", &ComplexitySignal::default(), &PlanningContext::new())
            .unwrap_err();
        assert_eq!(err, PlanningError::EmptyRequest);
    }

    #[test]
    fn test_hint_decides_unclassified_request() {
        let signal = ComplexitySignal::new(ComplexityLevel::Simple).with_task_hint(TaskType::Testing);
        let plan = RequestPlanner::new()
            .build_plan("do the thing", &signal, &PlanningContext::new())
            .unwrap();
        assert_eq!(plan.analysis.task_type, TaskType::Testing);
    }

    #[test]
    fn test_complex_plan_gets_trailing_quality_check() {
        let signal = ComplexitySignal::new(ComplexityLevel::Complex);
        let plan = RequestPlanner::new()
            .build_plan("write documentation for the readme", &signal, &PlanningContext::new())
            .unwrap();
        let last = plan.steps.last().unwrap();
        assert_eq!(last.agent_type, "code_quality");
        assert!(last.dependencies.contains(&plan.steps[plan.steps.len() - 2].id));
    }

    #[test]
    fn test_durations_scale_with_complexity() {
        let planner = RequestPlanner::new();
        let simple = planner
            .build_plan(
                "fix the bug",
                &ComplexitySignal::new(ComplexityLevel::Simple),
                &PlanningContext::new(),
            )
            .unwrap();
        let moderate = planner
            .build_plan(
                "fix the bug",
                &ComplexitySignal::new(ComplexityLevel::Moderate),
                &PlanningContext::new(),
            )
            .unwrap();
        assert_eq!(
            simple.total_estimated_duration_ms() * 2,
            moderate.total_estimated_duration_ms()
        );
    }

    #[test]
    fn test_unavailable_agent_types_are_bypassed() {
        let context =
            PlanningContext::new().with_available_agent_types(["bug_detector", "code_fixer"]);
        let plan = RequestPlanner::new()
            .build_plan("fix the bug", &ComplexitySignal::default(), &context)
            .unwrap();
        assert_eq!(ids(&plan), vec!["bug_detector_1", "code_fixer_2"]);
        assert!(plan.steps[1].dependencies.contains(&StepId::new("bug_detector_1")));
    }

    #[test]
    fn test_no_available_agent_types_is_a_failure() {
        let context = PlanningContext::new().with_available_agent_types(["nothing"]);
        let err = RequestPlanner::new()
            .build_plan("fix the bug", &ComplexitySignal::default(), &context)
            .unwrap_err();
        assert_eq!(err, PlanningError::EmptyPlan(TaskType::BugFix));
    }
}
