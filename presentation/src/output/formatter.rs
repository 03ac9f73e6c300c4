//! Output formatter trait

use conductor_application::FinalResponse;
use conductor_domain::{ExecutionPlan, OutputFormat};

/// Trait for rendering plans and run results
pub trait OutputFormatter {
    /// Human-readable plan
    fn format_plan(&self, plan: &ExecutionPlan) -> String;

    fn format_plan_json(&self, plan: &ExecutionPlan) -> String;

    /// Human-readable run result
    fn format_response(&self, response: &FinalResponse) -> String;

    fn format_response_json(&self, response: &FinalResponse) -> String;

    /// Render a plan in the requested format
    fn render_plan(&self, plan: &ExecutionPlan, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.format_plan(plan),
            OutputFormat::Json => self.format_plan_json(plan),
        }
    }

    /// Render a run result in the requested format
    fn render_response(&self, response: &FinalResponse, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.format_response(response),
            OutputFormat::Json => self.format_response_json(response),
        }
    }
}
