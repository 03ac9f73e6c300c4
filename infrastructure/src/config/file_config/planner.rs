//! Adaptive planner thresholds from TOML (`[planner]` section)

use conductor_application::PlannerParams;
use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePlannerConfig {
    /// More findings than this add a triage step
    pub high_finding_threshold: usize,
    /// Coverage ratio below which a test generation step is added
    pub min_test_coverage: f64,
}

impl Default for FilePlannerConfig {
    fn default() -> Self {
        Self {
            high_finding_threshold: 10,
            min_test_coverage: 0.6,
        }
    }
}

impl FilePlannerConfig {
    pub fn to_params(&self) -> PlannerParams {
        PlannerParams {
            high_finding_threshold: self.high_finding_threshold,
            min_test_coverage: self.min_test_coverage.clamp(0.0, 1.0),
        }
    }

    pub(super) fn threshold_issues(&self) -> Vec<ConfigIssue> {
        if (0.0..=1.0).contains(&self.min_test_coverage) {
            return Vec::new();
        }
        vec![ConfigIssue::warning(
            ConfigIssueCode::ThresholdOutOfRange,
            format!(
                "planner.min_test_coverage ({}) is outside 0.0..=1.0 and will be clamped",
                self.min_test_coverage
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_coverage_is_clamped() {
        let config = FilePlannerConfig {
            min_test_coverage: 1.5,
            ..Default::default()
        };
        assert_eq!(config.threshold_issues().len(), 1);
        assert_eq!(config.to_params().min_test_coverage, 1.0);
    }
}
