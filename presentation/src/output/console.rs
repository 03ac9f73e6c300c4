//! Console output formatter for plans and run results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use conductor_application::FinalResponse;
use conductor_domain::util::{truncate_str, truncate_with_ellipsis};
use conductor_domain::{
    ExecutionPlan, OutputFormat, PlanStep, StepResult, StepStatus, ToolAgentRegistration,
};
use serde_json::Value;

/// Longest step summary shown on one line
const SUMMARY_MAX_BYTES: usize = 96;

/// Formats plans and results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a plan before execution
    pub fn format_plan(plan: &ExecutionPlan) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Execution Plan"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Request:".cyan().bold(),
            plan.original_request
        ));
        output.push_str(&format!(
            "{} {} ({} complexity)\n",
            "Task type:".cyan().bold(),
            plan.analysis.task_type,
            plan.analysis.complexity.level
        ));
        output.push_str(&format!(
            "{} {} (version {})\n",
            "Plan:".cyan().bold(),
            plan.id,
            plan.version
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Estimated:".cyan().bold(),
            Self::duration(plan.total_estimated_duration_ms())
        ));

        output.push_str(&Self::section_header("Steps"));
        for (index, step) in plan.steps.iter().enumerate() {
            output.push_str(&Self::step_line(index + 1, step));
        }

        if !plan.conditionals.is_empty() {
            output.push_str(&Self::section_header("Conditional Steps"));
            for conditional in &plan.conditionals {
                let after: Vec<&str> = conditional.dependencies.iter().map(|d| d.as_str()).collect();
                output.push_str(&format!(
                    "  {} {}\n     then {} [{}]",
                    "?".yellow().bold(),
                    conditional.description,
                    conditional.then_step.id,
                    conditional.then_step.agent_type
                ));
                if !after.is_empty() {
                    output.push_str(&format!(", after {}", after.join(", ")));
                }
                output.push('\n');
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format the outcome of a run
    pub fn format_response(response: &FinalResponse) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Run Results"));
        output.push('\n');

        let status = if response.success {
            "SUCCESS".green().bold()
        } else {
            "FAILED".red().bold()
        };
        output.push_str(&format!("{} {}\n", "Status:".cyan().bold(), status));
        output.push_str(&format!("{}\n", response.content));

        if let Some(plan) = &response.plan {
            output.push_str(&Self::section_header(&format!(
                "Steps (plan version {})",
                plan.version
            )));
            for (index, step) in plan.steps.iter().enumerate() {
                output.push_str(&Self::step_line(index + 1, step));
                if let Some(result) = response.results.get(&step.id)
                    && let Some(summary) = Self::result_summary(result)
                {
                    output.push_str(&format!("     {}\n", summary.dimmed()));
                }
            }
        }

        let summary = &response.summary;
        output.push_str(&Self::section_header("Summary"));
        output.push_str(&format!(
            "  total {}  {} {}  {} {}  {} {}  {} {}\n",
            summary.total_tasks,
            "succeeded".green(),
            summary.successful_tasks,
            "failed".red(),
            summary.failed_tasks,
            "skipped".yellow(),
            summary.skipped_tasks,
            "blocked".magenta(),
            summary.blocked_tasks
        ));
        output.push_str(&format!("  took {}\n", Self::duration(summary.duration_ms)));

        if let Some(error) = &response.error {
            output.push_str(&format!("\n{} {}\n", "Error:".red().bold(), error));
        }

        output.push_str(&Self::footer());
        output
    }

    pub fn format_plan_json(plan: &ExecutionPlan) -> String {
        serde_json::to_string_pretty(plan).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn format_response_json(response: &FinalResponse) -> String {
        serde_json::to_string_pretty(response).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the registered agents, one per line
    pub fn format_agents(agents: &[ToolAgentRegistration], format: OutputFormat) -> String {
        if format.is_machine_readable() {
            return serde_json::to_string_pretty(agents).unwrap_or_else(|_| "[]".to_string());
        }

        let mut output = Self::section_header(&format!("Agents ({})", agents.len()));
        for agent in agents {
            let state = if agent.active {
                "active".green()
            } else {
                "inactive".red()
            };
            let types: Vec<&str> = agent
                .supported_message_types
                .iter()
                .map(String::as_str)
                .collect();
            output.push_str(&format!(
                "  {:<28} {:<24} {}  {}\n",
                agent.agent_id.bold(),
                agent.agent_type,
                state,
                types.join(", ").dimmed()
            ));
        }
        output
    }

    fn step_line(number: usize, step: &PlanStep) -> String {
        let status = match step.status {
            StepStatus::Completed => step.status.as_str().green(),
            StepStatus::Failed => step.status.as_str().red(),
            StepStatus::Skipped => step.status.as_str().yellow(),
            StepStatus::Running => step.status.as_str().cyan(),
            StepStatus::Pending => step.status.as_str().dimmed(),
        };
        let mut line = format!(
            "{:>3}. {} [{}] {} ({})\n",
            number,
            step.id.as_str().bold(),
            step.agent_type,
            step.title,
            status
        );
        if !step.dependencies.is_empty() {
            let deps: Vec<&str> = step.dependencies.iter().map(|d| d.as_str()).collect();
            line.push_str(&format!("     after {}\n", deps.join(", ")));
        }
        if let Some(error) = &step.error {
            line.push_str(&format!("     {}\n", truncate_str(error, SUMMARY_MAX_BYTES)));
        }
        line
    }

    fn result_summary(result: &StepResult) -> Option<String> {
        if !result.success || result.is_skipped() {
            return None;
        }
        match result.output.get("summary") {
            Some(Value::String(summary)) => Some(truncate_with_ellipsis(summary, SUMMARY_MAX_BYTES)),
            _ => None,
        }
    }

    fn duration(ms: u64) -> String {
        if ms < 1_000 {
            format!("{}ms", ms)
        } else if ms < 60_000 {
            format!("{:.1}s", ms as f64 / 1000.0)
        } else {
            format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000)
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_plan(&self, plan: &ExecutionPlan) -> String {
        Self::format_plan(plan)
    }

    fn format_plan_json(&self, plan: &ExecutionPlan) -> String {
        Self::format_plan_json(plan)
    }

    fn format_response(&self, response: &FinalResponse) -> String {
        Self::format_response(response)
    }

    fn format_response_json(&self, response: &FinalResponse) -> String {
        Self::format_response_json(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_application::ExecutionSummary;
    use conductor_domain::{ComplexitySignal, RequestAnalysis, StepId, StepResults, TaskType};
    use serde_json::Map;

    fn plan() -> ExecutionPlan {
        let analysis = RequestAnalysis::new(TaskType::BugFix, ComplexitySignal::default());
        ExecutionPlan::new("Fix the crash", analysis)
            .with_step(PlanStep::new("bug_detector_1", "bug_detector", "Detect bugs"))
            .with_step(
                PlanStep::new("code_fixer_2", "code_fixer", "Apply fixes")
                    .with_dependency("bug_detector_1")
                    .with_estimated_duration_ms(90_000),
            )
    }

    fn response() -> FinalResponse {
        let mut plan = plan();
        plan.steps[0].status = StepStatus::Completed;
        plan.steps[1].status = StepStatus::Failed;
        plan.steps[1].error = Some("compiler exploded".to_string());

        let mut output = Map::new();
        output.insert("summary".to_string(), Value::String("x".repeat(200)));
        let mut results = StepResults::new();
        results.insert(StepId::new("bug_detector_1"), StepResult::success(output));
        results.insert(
            StepId::new("code_fixer_2"),
            StepResult::failure("compiler exploded"),
        );

        FinalResponse {
            success: false,
            content: "1 of 2 steps succeeded".to_string(),
            plan: Some(plan),
            results,
            summary: ExecutionSummary {
                total_tasks: 2,
                successful_tasks: 1,
                failed_tasks: 1,
                skipped_tasks: 0,
                blocked_tasks: 0,
                duration_ms: 1_500,
            },
            error: None,
        }
    }

    #[test]
    fn test_plan_lists_steps_in_order() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_plan(&plan());
        let detect = text.find("bug_detector_1 [bug_detector]").unwrap();
        let fix = text.find("code_fixer_2 [code_fixer]").unwrap();
        assert!(detect < fix);
        assert!(text.contains("after bug_detector_1"));
        assert!(text.contains("bug_fix (moderate complexity)"));
        assert!(text.contains("1m30s"));
    }

    #[test]
    fn test_response_shows_summary_and_errors() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_response(&response());
        assert!(text.contains("FAILED"));
        assert!(text.contains("compiler exploded"));
        assert!(text.contains("total 2"));
        assert!(text.contains("took 1.5s"));
        // Long summaries are cut
        assert!(text.contains(&format!("{}...", "x".repeat(SUMMARY_MAX_BYTES))));
    }

    #[test]
    fn test_json_rendering() {
        let json = ConsoleFormatter.render_response(&response(), OutputFormat::Json);
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["summary"]["failed_tasks"], 1);
        assert_eq!(value["plan"]["steps"][1]["status"], "FAILED");

        let plan_json = ConsoleFormatter.render_plan(&plan(), OutputFormat::Json);
        let value: Value = serde_json::from_str(&plan_json).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["steps"][0]["id"], "bug_detector_1");
    }

    #[test]
    fn test_agents_listing() {
        colored::control::set_override(false);
        let agents = vec![
            ToolAgentRegistration::new("bug_detector-echo", "bug_detector")
                .with_message_types(["bug_detector.execute".to_string()]),
        ];
        let text = ConsoleFormatter::format_agents(&agents, OutputFormat::Text);
        assert!(text.contains("Agents (1)"));
        assert!(text.contains("bug_detector.execute"));
        assert!(text.contains("active"));

        let json = ConsoleFormatter::format_agents(&agents, OutputFormat::Json);
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["agent_id"], "bug_detector-echo");
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(ConsoleFormatter::duration(250), "250ms");
        assert_eq!(ConsoleFormatter::duration(2_500), "2.5s");
        assert_eq!(ConsoleFormatter::duration(125_000), "2m05s");
    }
}
