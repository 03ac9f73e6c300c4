//! Adaptive planner use case
//!
//! Extends [`RequestPlanner`] with two kinds of run-time adaptation:
//!
//! - a "deep analysis if any CRITICAL finding" [`ConditionalStep`] attached
//!   to plans that run a quality check or bug detection
//! - a fixed rule table scanned against completed step results, each match
//!   splicing one follow-up step after its source step
//!
//! | Rule | Trigger | Follow-up |
//! |------|---------|-----------|
//! | `high_finding_count` | more findings than the threshold | finding triage |
//! | `performance_signal` | `performance` finding or `performance_issues: true` | performance analysis |
//! | `security_signal` | `security` finding | security audit |
//! | `test_coverage` | `test_coverage` below the minimum | test generation |
//!
//! Rules are checked in table order; each fires at most once per source step.

use super::request_planner::RequestPlanner;
use crate::config::PlannerParams;
use crate::ports::planner::{Planner, PlanningError};
use async_trait::async_trait;
use conductor_domain::{
    ComplexitySignal, ConditionalStep, DynamicPlanModifier, ExecutionContext, ExecutionPlan,
    FindingSeverity, PlanStep, PlanningContext, StepId, StepResult, StepResults, StepStatus,
    agent_types,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Metadata key naming the rule that produced a follow-up step
const RULE_KEY: &str = "adaptive_rule";
/// Metadata key naming the step whose result triggered the rule
const SOURCE_KEY: &str = "triggered_by";

struct FollowUp {
    agent_type: &'static str,
    title: &'static str,
    description: String,
}

type RuleFn = fn(&PlannerParams, &PlanStep, &StepResult) -> Option<FollowUp>;

const RULES: [(&str, RuleFn); 4] = [
    ("high_finding_count", high_finding_count),
    ("performance_signal", performance_signal),
    ("security_signal", security_signal),
    ("test_coverage", test_coverage),
];

fn high_finding_count(
    params: &PlannerParams,
    _source: &PlanStep,
    result: &StepResult,
) -> Option<FollowUp> {
    let count = result.findings().len();
    (count > params.high_finding_threshold).then(|| FollowUp {
        agent_type: agent_types::FINDING_TRIAGE,
        title: "Triage findings",
        description: format!("Prioritize {count} findings"),
    })
}

fn performance_signal(
    _params: &PlannerParams,
    _source: &PlanStep,
    result: &StepResult,
) -> Option<FollowUp> {
    let flagged = result
        .output
        .get("performance_issues")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let finding = result.findings().iter().any(|f| f.is_category("performance"));
    (flagged || finding).then(|| FollowUp {
        agent_type: agent_types::PERFORMANCE_ANALYZER,
        title: "Analyze performance",
        description: "Investigate reported performance issues".to_string(),
    })
}

fn security_signal(
    _params: &PlannerParams,
    _source: &PlanStep,
    result: &StepResult,
) -> Option<FollowUp> {
    let count = result
        .findings()
        .iter()
        .filter(|f| f.is_category("security"))
        .count();
    (count > 0).then(|| FollowUp {
        agent_type: agent_types::SECURITY_ANALYZER,
        title: "Security audit",
        description: format!("Audit {count} security findings"),
    })
}

fn test_coverage(
    params: &PlannerParams,
    _source: &PlanStep,
    result: &StepResult,
) -> Option<FollowUp> {
    let coverage = result.output.get("test_coverage").and_then(Value::as_f64)?;
    (coverage < params.min_test_coverage).then(|| FollowUp {
        agent_type: agent_types::TEST_GENERATOR,
        title: "Generate tests",
        description: format!(
            "Raise coverage from {:.0}% to at least {:.0}%",
            coverage * 100.0,
            params.min_test_coverage * 100.0
        ),
    })
}

/// Planner that attaches conditionals and adapts plans to step results.
#[derive(Debug, Clone, Default)]
pub struct AdaptivePlanner {
    base: RequestPlanner,
    params: PlannerParams,
}

impl AdaptivePlanner {
    pub fn new(params: PlannerParams) -> Self {
        Self {
            base: RequestPlanner::new(),
            params,
        }
    }

    /// Attach the deep-analysis conditional after the last quality check or
    /// bug detection step.
    fn attach_conditionals(&self, plan: ExecutionPlan, context: &PlanningContext) -> ExecutionPlan {
        if !context.allows_agent_type(agent_types::DEEP_ANALYZER) {
            return plan;
        }
        let Some(source) = plan
            .steps
            .iter()
            .rev()
            .find(|s| {
                s.agent_type == agent_types::CODE_QUALITY
                    || s.agent_type == agent_types::BUG_DETECTOR
            })
            .map(|s| s.id.clone())
        else {
            return plan;
        };

        let then_step = PlanStep::new(
            unique_step_id(&plan, agent_types::DEEP_ANALYZER),
            agent_types::DEEP_ANALYZER,
            "Deep analysis",
        )
        .with_description("Analyze critical findings in depth")
        .with_input("request", plan.original_request.as_str())
        .with_input("source_step", source.as_str());

        let conditional = ConditionalStep::new(
            format!("deep_analysis_if_critical_{source}"),
            "any CRITICAL finding",
            |_, results: &StepResults| {
                Ok(results.values().any(|r| {
                    r.findings()
                        .iter()
                        .any(|f| f.severity == FindingSeverity::Critical)
                }))
            },
            then_step,
        )
        .with_dependency(source);

        debug!(conditional = %conditional.id, "Attached deep analysis conditional");
        plan.with_conditional(conditional)
    }

    fn rule_already_fired(plan: &ExecutionPlan, rule: &str, source: &StepId) -> bool {
        plan.steps.iter().any(|s| {
            s.metadata_str(RULE_KEY) == Some(rule) && s.metadata_str(SOURCE_KEY) == Some(source.as_str())
        })
    }
}

#[async_trait]
impl Planner for AdaptivePlanner {
    async fn create_plan(
        &self,
        request: &str,
        complexity: &ComplexitySignal,
        context: &PlanningContext,
    ) -> Result<ExecutionPlan, PlanningError> {
        let mut plan = self.base.build_plan(request, complexity, context)?;
        plan.metadata
            .insert("planner".to_string(), "adaptive".into());
        Ok(self.attach_conditionals(plan, context))
    }

    fn modify_plan_based_on_results(
        &self,
        plan: &ExecutionPlan,
        results: &StepResults,
        _context: &ExecutionContext,
    ) -> ExecutionPlan {
        let sources: Vec<PlanStep> = plan
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .cloned()
            .collect();

        let mut current = plan.clone();
        for source in &sources {
            let Some(result) = results.get(&source.id) else {
                continue;
            };
            if !result.success || result.is_skipped() {
                continue;
            }

            for (rule, check) in RULES {
                if Self::rule_already_fired(&current, rule, &source.id) {
                    continue;
                }
                let Some(follow_up) = check(&self.params, source, result) else {
                    continue;
                };
                // A follow-up never re-triggers its own kind of step
                if follow_up.agent_type == source.agent_type {
                    continue;
                }

                let step = PlanStep::new(
                    unique_step_id(&current, follow_up.agent_type),
                    follow_up.agent_type,
                    follow_up.title,
                )
                .with_description(follow_up.description)
                .with_dependency(source.id.clone())
                .with_input("request", current.original_request.as_str())
                .with_input("source_step", source.id.as_str())
                .with_metadata(RULE_KEY, rule)
                .with_metadata(SOURCE_KEY, source.id.as_str());

                match DynamicPlanModifier::add_step_after(&current, step, &source.id) {
                    Ok(next) => {
                        info!(
                            rule,
                            source = %source.id,
                            version = next.version,
                            "Adaptive rule added a follow-up step"
                        );
                        current = next;
                    }
                    Err(e) => warn!(rule, source = %source.id, error = %e, "Adaptive rule rejected"),
                }
            }
        }
        current
    }
}

/// Next free `"{agent_type}_{n}"` id, with `n` starting after the step count.
fn unique_step_id(plan: &ExecutionPlan, agent_type: &str) -> StepId {
    let taken = |id: &StepId| {
        plan.contains_step(id) || plan.conditionals.iter().any(|c| c.then_step.id == *id)
    };
    let mut n = plan.steps.len() + 1;
    loop {
        let id = StepId::new(format!("{agent_type}_{n}"));
        if !taken(&id) {
            return id;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn planner() -> AdaptivePlanner {
        AdaptivePlanner::new(PlannerParams::default())
    }

    async fn bug_fix_plan() -> ExecutionPlan {
        planner()
            .create_plan(
                "fix the crash",
                &ComplexitySignal::default(),
                &PlanningContext::new(),
            )
            .await
            .unwrap()
    }

    fn complete(plan: &mut ExecutionPlan, id: &str) {
        plan.set_step_status(&id.into(), StepStatus::Completed, None);
    }

    fn findings(n: usize, category: &str) -> Value {
        Value::Array(
            (0..n)
                .map(|i| json!({"severity": "LOW", "category": category, "message": format!("f{i}")}))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_attaches_deep_analysis_conditional() {
        let plan = bug_fix_plan().await;
        assert_eq!(plan.conditionals.len(), 1);
        let conditional = &plan.conditionals[0];
        assert!(conditional.dependencies.contains(&StepId::new("code_quality_2")));
        assert_eq!(conditional.then_step.agent_type, agent_types::DEEP_ANALYZER);
        assert_eq!(conditional.then_step.id.as_str(), "deep_analyzer_4");
        assert_eq!(plan.version, 1);
    }

    #[tokio::test]
    async fn test_no_conditional_without_quality_or_bug_step() {
        let plan = planner()
            .create_plan(
                "write the readme docs",
                &ComplexitySignal::default(),
                &PlanningContext::new(),
            )
            .await
            .unwrap();
        assert!(plan.conditionals.is_empty());
    }

    #[tokio::test]
    async fn test_critical_finding_splices_deep_analysis() {
        let mut plan = bug_fix_plan().await;
        complete(&mut plan, "bug_detector_1");
        complete(&mut plan, "code_quality_2");
        let mut results = StepResults::new();
        results.insert(
            "code_quality_2".into(),
            StepResult::success(Map::new())
                .with_output("findings", json!([{"severity": "CRITICAL", "message": "null deref"}])),
        );

        let resolved =
            planner().resolve_conditionals(&plan, &ExecutionContext::default(), &results);
        assert_eq!(resolved.version, 2);
        assert_eq!(
            resolved.step_ids(),
            vec![
                StepId::new("bug_detector_1"),
                "code_quality_2".into(),
                "deep_analyzer_4".into(),
                "code_fixer_3".into()
            ]
        );
        assert!(resolved.conditionals.is_empty());
    }

    #[tokio::test]
    async fn test_high_finding_count_adds_triage_once() {
        let mut plan = bug_fix_plan().await;
        complete(&mut plan, "bug_detector_1");
        let mut results = StepResults::new();
        results.insert(
            "bug_detector_1".into(),
            StepResult::success(Map::new()).with_output("findings", findings(11, "style")),
        );

        let adapted =
            planner().modify_plan_based_on_results(&plan, &results, &ExecutionContext::default());
        assert_eq!(adapted.version, plan.version + 1);
        let triage = &adapted.steps[1];
        assert_eq!(triage.agent_type, agent_types::FINDING_TRIAGE);
        assert!(triage.dependencies.contains(&StepId::new("bug_detector_1")));
        assert_eq!(triage.metadata_str(RULE_KEY), Some("high_finding_count"));

        let again =
            planner().modify_plan_based_on_results(&adapted, &results, &ExecutionContext::default());
        assert_eq!(again.version, adapted.version);
        assert_eq!(again.steps.len(), adapted.steps.len());
    }

    #[tokio::test]
    async fn test_threshold_is_exclusive() {
        let mut plan = bug_fix_plan().await;
        complete(&mut plan, "bug_detector_1");
        let mut results = StepResults::new();
        results.insert(
            "bug_detector_1".into(),
            StepResult::success(Map::new()).with_output("findings", findings(10, "style")),
        );
        let adapted =
            planner().modify_plan_based_on_results(&plan, &results, &ExecutionContext::default());
        assert_eq!(adapted.version, plan.version);
    }

    #[tokio::test]
    async fn test_each_matching_rule_bumps_version_once() {
        let mut plan = bug_fix_plan().await;
        complete(&mut plan, "bug_detector_1");
        let mut findings = findings(1, "security").as_array().cloned().unwrap();
        findings.push(json!({"severity": "HIGH", "category": "performance"}));
        let mut results = StepResults::new();
        results.insert(
            "bug_detector_1".into(),
            StepResult::success(Map::new())
                .with_output("findings", Value::Array(findings))
                .with_output("test_coverage", 0.3),
        );

        let adapted =
            planner().modify_plan_based_on_results(&plan, &results, &ExecutionContext::default());
        assert_eq!(adapted.version, plan.version + 3);
        let rules: Vec<_> = adapted
            .steps
            .iter()
            .filter_map(|s| s.metadata_str(RULE_KEY))
            .collect();
        assert_eq!(rules.len(), 3);
        assert!(rules.contains(&"performance_signal"));
        assert!(rules.contains(&"security_signal"));
        assert!(rules.contains(&"test_coverage"));
    }

    #[tokio::test]
    async fn test_failed_and_pending_steps_are_ignored() {
        let mut plan = bug_fix_plan().await;
        plan.set_step_status(&"bug_detector_1".into(), StepStatus::Failed, Some("x".into()));
        let mut results = StepResults::new();
        results.insert(
            "bug_detector_1".into(),
            StepResult::failure("x").with_output("performance_issues", true),
        );
        let adapted =
            planner().modify_plan_based_on_results(&plan, &results, &ExecutionContext::default());
        assert_eq!(adapted.version, plan.version);
    }

    #[tokio::test]
    async fn test_performance_step_does_not_retrigger_itself() {
        let mut plan = bug_fix_plan().await;
        complete(&mut plan, "bug_detector_1");
        let mut results = StepResults::new();
        results.insert(
            "bug_detector_1".into(),
            StepResult::success(Map::new()).with_output("performance_issues", true),
        );
        let mut adapted =
            planner().modify_plan_based_on_results(&plan, &results, &ExecutionContext::default());
        let perf_id = adapted.steps[1].id.clone();
        assert_eq!(adapted.steps[1].agent_type, agent_types::PERFORMANCE_ANALYZER);

        adapted.set_step_status(&perf_id, StepStatus::Completed, None);
        results.insert(
            perf_id,
            StepResult::success(Map::new()).with_output("performance_issues", true),
        );
        let again =
            planner().modify_plan_based_on_results(&adapted, &results, &ExecutionContext::default());
        assert_eq!(again.version, adapted.version);
    }
}
