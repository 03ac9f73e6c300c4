//! Plan value objects - identifiers, step results and execution context.
//!
//! # Identifiers
//! - [`PlanId`] - Unique identifier for an execution plan
//! - [`StepId`] - Identifier for a step, unique within its plan
//!
//! # Execution Data
//! - [`StepResult`] - Outcome produced by the tool agent that ran a step
//! - [`ExecutionContext`] - Run-time context handed to agents and conditions
//! - [`Finding`] - A single issue reported in a step's output

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Unique identifier for an execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new random plan id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for PlanId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a step within a plan.
///
/// Planner-generated ids follow the `"{agent_type}_{n}"` pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for StepId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Results of executed steps, keyed by step id.
pub type StepResults = HashMap<StepId, StepResult>;

/// Metadata key marking a synthetic result for a step that did not run.
pub const SKIPPED_KEY: &str = "skipped";

/// Result of executing a single step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub output: Map<String, Value>,
    pub error: Option<String>,
    pub metadata: Map<String, Value>,
}

impl StepResult {
    pub fn success(output: Map<String, Value>) -> Self {
        Self {
            success: true,
            output,
            error: None,
            metadata: Map::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: Map::new(),
            error: Some(error.into()),
            metadata: Map::new(),
        }
    }

    /// Successful result standing in for a step that was not executed.
    pub fn skipped(reason: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert(SKIPPED_KEY.to_string(), Value::Bool(true));
        metadata.insert("reason".to_string(), Value::String(reason.into()));
        Self {
            success: true,
            output: Map::new(),
            error: None,
            metadata,
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.output.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.metadata
            .get(SKIPPED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Findings reported under the `findings` output key.
    ///
    /// Entries that are not objects with at least a `severity` are ignored.
    pub fn findings(&self) -> Vec<Finding> {
        self.output
            .get("findings")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value::<Finding>(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Severity of a reported finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// An issue reported by an analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: FindingSeverity,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl Finding {
    pub fn new(severity: FindingSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: None,
            message: message.into(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn is_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(category))
    }
}

/// Run-time context for a plan execution.
///
/// Passed to tool agents with every step and to conditional predicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub plan_id: Option<PlanId>,
    pub original_request: String,
    pub project_root: Option<String>,
    pub variables: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(original_request: impl Into<String>) -> Self {
        Self {
            original_request: original_request.into(),
            ..Default::default()
        }
    }

    pub fn with_plan_id(mut self, plan_id: PlanId) -> Self {
        self.plan_id = Some(plan_id);
        self
    }

    pub fn with_project_root(mut self, root: impl Into<String>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }
}
