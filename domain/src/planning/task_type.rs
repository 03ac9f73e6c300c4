//! Task classification from free-form requests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of work a request asks for; selects the step template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    BugFix,
    ArchitectureAnalysis,
    CodeReview,
    Refactoring,
    Documentation,
    Testing,
    Performance,
    Security,
    #[default]
    General,
}

impl TaskType {
    pub const ALL: [TaskType; 9] = [
        TaskType::BugFix,
        TaskType::ArchitectureAnalysis,
        TaskType::CodeReview,
        TaskType::Refactoring,
        TaskType::Documentation,
        TaskType::Testing,
        TaskType::Performance,
        TaskType::Security,
        TaskType::General,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            TaskType::BugFix => "bug_fix",
            TaskType::ArchitectureAnalysis => "architecture_analysis",
            TaskType::CodeReview => "code_review",
            TaskType::Refactoring => "refactoring",
            TaskType::Documentation => "documentation",
            TaskType::Testing => "testing",
            TaskType::Performance => "performance",
            TaskType::Security => "security",
            TaskType::General => "general",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            TaskType::BugFix => &[
                "bug", "fix", "error", "crash", "broken", "exception", "failing", "issue",
            ],
            TaskType::ArchitectureAnalysis => &[
                "architecture", "structure", "design", "dependency", "dependencies", "module",
                "layer", "overview",
            ],
            TaskType::CodeReview => &["review", "quality", "lint", "smell", "audit code"],
            TaskType::Refactoring => &[
                "refactor", "restructure", "clean up", "cleanup", "simplify", "extract",
                "rename",
            ],
            TaskType::Documentation => &["document", "documentation", "readme", "docs", "explain"],
            TaskType::Testing => &["test", "tests", "coverage", "unit test", "spec"],
            TaskType::Performance => &[
                "performance", "slow", "optimize", "latency", "memory", "speed", "profil",
            ],
            TaskType::Security => &[
                "security", "vulnerab", "cve", "injection", "xss", "secret", "auth",
            ],
            TaskType::General => &[],
        }
    }

    /// Classify a request by keyword score.
    ///
    /// Ties go to `hint` when it is among the best scorers, otherwise to the
    /// earliest type in [`TaskType::ALL`]. No keyword hit at all yields
    /// `hint` or [`TaskType::General`].
    pub fn classify(request: &str, hint: Option<TaskType>) -> TaskType {
        let lowered = request.to_lowercase();
        let scores: Vec<(TaskType, usize)> = TaskType::ALL
            .iter()
            .map(|t| {
                let score = t.keywords().iter().filter(|k| lowered.contains(*k)).count();
                (*t, score)
            })
            .collect();

        let best = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
        if best == 0 {
            return hint.unwrap_or_default();
        }

        if let Some(hint) = hint
            && scores.iter().any(|(t, s)| *t == hint && *s == best)
        {
            return hint;
        }

        scores
            .into_iter()
            .find(|(_, s)| *s == best)
            .map(|(t, _)| t)
            .unwrap_or_default()
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        TaskType::ALL
            .iter()
            .find(|t| t.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown task type: {s}"))
    }
}
