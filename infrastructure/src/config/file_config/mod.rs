//! Raw TOML configuration data types
//!
//! These structs mirror the config file exactly, with durations in
//! milliseconds. [`FileConfig::to_coordination_config`] converts them to the
//! application's [`CoordinationConfig`].

mod bus;
mod orchestrator;
mod output;
mod planner;
mod registry;

pub use bus::FileBusConfig;
pub use orchestrator::FileOrchestratorConfig;
pub use output::FileOutputConfig;
pub use planner::FilePlannerConfig;
pub use registry::FileRegistryConfig;

use conductor_application::CoordinationConfig;
use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub bus: FileBusConfig,
    pub registry: FileRegistryConfig,
    pub orchestrator: FileOrchestratorConfig,
    pub planner: FilePlannerConfig,
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Zero durations are errors; inconsistent windows and out-of-range
    /// thresholds are warnings.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let durations = [
            ("bus.default_timeout_ms", self.bus.default_timeout_ms),
            (
                "registry.heartbeat_interval_ms",
                self.registry.heartbeat_interval_ms,
            ),
            ("registry.inactive_after_ms", self.registry.inactive_after_ms),
            (
                "registry.cleanup_interval_ms",
                self.registry.cleanup_interval_ms,
            ),
            ("registry.remove_after_ms", self.registry.remove_after_ms),
            (
                "orchestrator.step_timeout_ms",
                self.orchestrator.step_timeout_ms,
            ),
        ];
        for (field, value) in durations {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroDuration,
                    format!("{field} must be greater than zero"),
                ));
            }
        }

        issues.extend(self.registry.window_issues());
        issues.extend(self.planner.threshold_issues());
        issues
    }

    pub fn to_coordination_config(&self) -> CoordinationConfig {
        CoordinationConfig {
            bus: self.bus.to_params(),
            registry: self.registry.to_params(),
            orchestrator: self.orchestrator.to_params(),
            planner: self.planner.to_params(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[bus]
default_timeout_ms = 5000

[registry]
heartbeat_interval_ms = 1000
inactive_after_ms = 4000
cleanup_interval_ms = 2000
remove_after_ms = 8000

[orchestrator]
adaptive = false
max_iterations = 12
step_timeout_ms = 60000

[planner]
high_finding_threshold = 3
min_test_coverage = 0.8
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bus.default_timeout_ms, 5000);
        assert_eq!(config.registry.remove_after_ms, 8000);
        assert!(!config.orchestrator.adaptive);
        assert_eq!(config.planner.high_finding_threshold, 3);
        assert!(config.validate().is_empty());

        let coordination = config.to_coordination_config();
        assert_eq!(coordination.bus.default_timeout, Duration::from_secs(5));
        assert_eq!(coordination.registry.inactive_after, Duration::from_secs(4));
        assert_eq!(coordination.orchestrator.max_iterations, 12);
        assert_eq!(coordination.orchestrator.step_timeout, Duration::from_secs(60));
        assert_eq!(coordination.planner.min_test_coverage, 0.8);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[orchestrator]
max_iterations = 5
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.orchestrator.max_iterations, 5);
        // Defaults should apply
        assert!(config.orchestrator.adaptive);
        assert_eq!(config.registry, FileRegistryConfig::default());
        assert_eq!(config.bus.default_timeout_ms, 30_000);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(FileConfig::default().validate().is_empty());
    }

    #[test]
    fn test_zero_durations_are_errors() {
        let mut config = FileConfig::default();
        config.bus.default_timeout_ms = 0;
        config.registry.cleanup_interval_ms = 0;

        let errors: Vec<_> = config
            .validate()
            .into_iter()
            .filter(ConfigIssue::is_error)
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|i| i.code == ConfigIssueCode::ZeroDuration));
        assert!(errors[0].message.contains("bus.default_timeout_ms"));
    }

    #[test]
    fn test_short_inactive_window_warns() {
        let mut config = FileConfig::default();
        config.registry.inactive_after_ms = 10_000;

        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::InactiveWindowTooShort);
        assert!(!issues[0].is_error());
    }
}
