//! Fixed step menus per task type.

use super::task_type::TaskType;
use crate::agent::agent_types;

/// Blueprint for one planned step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTemplate {
    pub agent_type: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Estimate at moderate complexity
    pub base_duration_ms: u64,
}

impl StepTemplate {
    const fn new(
        agent_type: &'static str,
        title: &'static str,
        description: &'static str,
        base_duration_ms: u64,
    ) -> Self {
        Self {
            agent_type,
            title,
            description,
            base_duration_ms,
        }
    }
}

const SCAN: StepTemplate = StepTemplate::new(
    agent_types::PROJECT_SCANNER,
    "Scan project",
    "Collect project structure, languages and entry points",
    10_000,
);
const DETECT_BUGS: StepTemplate = StepTemplate::new(
    agent_types::BUG_DETECTOR,
    "Detect bugs",
    "Locate the defect described in the request",
    30_000,
);
const QUALITY_CHECK: StepTemplate = StepTemplate::new(
    agent_types::CODE_QUALITY,
    "Check code quality",
    "Run static quality checks over the affected code",
    20_000,
);
const FIX: StepTemplate = StepTemplate::new(
    agent_types::CODE_FIXER,
    "Apply fix",
    "Propose and apply a fix for the detected issues",
    40_000,
);
const ANALYZE_ARCHITECTURE: StepTemplate = StepTemplate::new(
    agent_types::ARCHITECTURE_ANALYZER,
    "Analyze architecture",
    "Map modules, layers and their dependencies",
    45_000,
);
const DOCUMENT: StepTemplate = StepTemplate::new(
    agent_types::DOCUMENTATION,
    "Write documentation",
    "Summarize the findings as documentation",
    20_000,
);
const REFACTOR: StepTemplate = StepTemplate::new(
    agent_types::REFACTORING,
    "Refactor",
    "Restructure the code without changing behavior",
    40_000,
);
const GENERATE_TESTS: StepTemplate = StepTemplate::new(
    agent_types::TEST_GENERATOR,
    "Generate tests",
    "Write tests covering the requested behavior",
    30_000,
);
const ANALYZE_PERFORMANCE: StepTemplate = StepTemplate::new(
    agent_types::PERFORMANCE_ANALYZER,
    "Analyze performance",
    "Find hot paths and expensive operations",
    35_000,
);
const AUDIT_SECURITY: StepTemplate = StepTemplate::new(
    agent_types::SECURITY_ANALYZER,
    "Audit security",
    "Look for vulnerabilities and unsafe patterns",
    35_000,
);
const ASSIST: StepTemplate = StepTemplate::new(
    agent_types::GENERAL_ASSISTANT,
    "Handle request",
    "Answer the request directly",
    15_000,
);

/// Trailing quality check appended to complex plans.
pub const FINAL_QUALITY_CHECK: StepTemplate = QUALITY_CHECK;

/// Steps for a task type, in execution order. Each step depends on the previous one.
pub fn templates_for(task_type: TaskType) -> &'static [StepTemplate] {
    match task_type {
        TaskType::BugFix => &[DETECT_BUGS, QUALITY_CHECK, FIX],
        TaskType::ArchitectureAnalysis => &[SCAN, ANALYZE_ARCHITECTURE, QUALITY_CHECK, DOCUMENT],
        TaskType::CodeReview => &[SCAN, QUALITY_CHECK, DOCUMENT],
        TaskType::Refactoring => &[SCAN, QUALITY_CHECK, REFACTOR, GENERATE_TESTS],
        TaskType::Documentation => &[SCAN, DOCUMENT],
        TaskType::Testing => &[SCAN, GENERATE_TESTS],
        TaskType::Performance => &[SCAN, ANALYZE_PERFORMANCE, FIX],
        TaskType::Security => &[SCAN, AUDIT_SECURITY, FIX],
        TaskType::General => &[ASSIST],
    }
}
