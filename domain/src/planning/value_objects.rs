//! Planning inputs: complexity signal, request analysis and planning context.

use super::task_type::TaskType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Coarse complexity level computed outside the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl ComplexityLevel {
    pub fn as_str(&self) -> &str {
        match self {
            ComplexityLevel::Simple => "simple",
            ComplexityLevel::Moderate => "moderate",
            ComplexityLevel::Complex => "complex",
        }
    }

    /// Multiplier applied to template duration estimates.
    pub fn duration_factor(&self) -> f64 {
        match self {
            ComplexityLevel::Simple => 0.5,
            ComplexityLevel::Moderate => 1.0,
            ComplexityLevel::Complex => 2.0,
        }
    }
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplexityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" | "s" => Ok(ComplexityLevel::Simple),
            "moderate" | "m" => Ok(ComplexityLevel::Moderate),
            "complex" | "c" => Ok(ComplexityLevel::Complex),
            _ => Err(format!("unknown complexity level: {s}")),
        }
    }
}

/// Precomputed complexity classification of a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexitySignal {
    pub level: ComplexityLevel,
    /// Normalized score in 0.0..=1.0
    pub score: f64,
    /// Optional task type suggested by the classifier
    pub task_hint: Option<TaskType>,
}

impl ComplexitySignal {
    pub fn new(level: ComplexityLevel) -> Self {
        let score = match level {
            ComplexityLevel::Simple => 0.2,
            ComplexityLevel::Moderate => 0.5,
            ComplexityLevel::Complex => 0.8,
        };
        Self {
            level,
            score,
            task_hint: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_task_hint(mut self, hint: TaskType) -> Self {
        self.task_hint = Some(hint);
        self
    }
}

/// What the planner concluded about a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAnalysis {
    pub task_type: TaskType,
    pub complexity: ComplexitySignal,
    pub summary: String,
}

impl RequestAnalysis {
    pub fn new(task_type: TaskType, complexity: ComplexitySignal) -> Self {
        Self {
            task_type,
            complexity,
            summary: String::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}

/// Environment the planner plans against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningContext {
    pub project_root: Option<String>,
    /// Agent types that can currently run steps; `None` means unrestricted
    pub available_agent_types: Option<HashSet<String>>,
    pub metadata: HashMap<String, String>,
}

impl PlanningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project_root(mut self, root: impl Into<String>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn with_available_agent_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_agent_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn allows_agent_type(&self, agent_type: &str) -> bool {
        self.available_agent_types
            .as_ref()
            .is_none_or(|types| types.contains(agent_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_parse() {
        assert_eq!("Complex".parse(), Ok(ComplexityLevel::Complex));
        assert_eq!("s".parse(), Ok(ComplexityLevel::Simple));
        assert!("huge".parse::<ComplexityLevel>().is_err());
    }

    #[test]
    fn test_score_clamped() {
        let signal = ComplexitySignal::new(ComplexityLevel::Simple).with_score(3.0);
        assert_eq!(signal.score, 1.0);
    }

    #[test]
    fn test_agent_type_filter() {
        assert!(PlanningContext::new().allows_agent_type("anything"));
        let ctx = PlanningContext::new().with_available_agent_types(["bug_detector"]);
        assert!(ctx.allows_agent_type("bug_detector"));
        assert!(!ctx.allows_agent_type("code_fixer"));
    }
}
