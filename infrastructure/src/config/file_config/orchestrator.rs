//! Orchestrator configuration from TOML (`[orchestrator]` section)

use conductor_application::OrchestratorParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    /// Adapt plans to step results (false = static planner)
    pub adaptive: bool,
    /// Upper bound on executed steps per plan
    pub max_iterations: usize,
    pub step_timeout_ms: u64,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            max_iterations: 100,
            step_timeout_ms: 300_000,
        }
    }
}

impl FileOrchestratorConfig {
    pub fn to_params(&self) -> OrchestratorParams {
        OrchestratorParams {
            adaptive: self.adaptive,
            max_iterations: self.max_iterations,
            step_timeout: Duration::from_millis(self.step_timeout_ms),
        }
    }
}
