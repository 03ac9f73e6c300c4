//! Well-known agent types referenced by step templates and plan rules.

pub const PROJECT_SCANNER: &str = "project_scanner";
pub const BUG_DETECTOR: &str = "bug_detector";
pub const CODE_QUALITY: &str = "code_quality";
pub const CODE_FIXER: &str = "code_fixer";
pub const ARCHITECTURE_ANALYZER: &str = "architecture_analyzer";
pub const DOCUMENTATION: &str = "documentation";
pub const TEST_GENERATOR: &str = "test_generator";
pub const PERFORMANCE_ANALYZER: &str = "performance_analyzer";
pub const SECURITY_ANALYZER: &str = "security_analyzer";
pub const REFACTORING: &str = "refactoring";
pub const DEEP_ANALYZER: &str = "deep_analyzer";
pub const FINDING_TRIAGE: &str = "finding_triage";
pub const GENERAL_ASSISTANT: &str = "general_assistant";

/// Every type above, for wiring default agents.
pub const ALL: [&str; 13] = [
    PROJECT_SCANNER,
    BUG_DETECTOR,
    CODE_QUALITY,
    CODE_FIXER,
    ARCHITECTURE_ANALYZER,
    DOCUMENTATION,
    TEST_GENERATOR,
    PERFORMANCE_ANALYZER,
    SECURITY_ANALYZER,
    REFACTORING,
    DEEP_ANALYZER,
    FINDING_TRIAGE,
    GENERAL_ASSISTANT,
];
