//! Coordination parameters - bus, registry, planner and orchestrator knobs.
//!
//! [`CoordinationConfig`] is the resolved form of the file/env configuration.
//! Durations are already converted from milliseconds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message bus parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusParams {
    /// Timeout used when a request does not carry its own.
    pub default_timeout: Duration,
}

impl Default for BusParams {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
        }
    }
}

/// Registry liveness windows.
///
/// | Window | Effect |
/// |--------|--------|
/// | `inactive_after` | silent agents flip to inactive |
/// | `remove_after` | silent agents are unregistered |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryParams {
    /// Heartbeat monitor tick.
    pub heartbeat_interval: Duration,
    pub inactive_after: Duration,
    /// Cleanup sweep tick.
    pub cleanup_interval: Duration,
    pub remove_after: Duration,
}

impl Default for RegistryParams {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            inactive_after: Duration::from_secs(120),
            cleanup_interval: Duration::from_secs(300),
            remove_after: Duration::from_secs(600),
        }
    }
}

impl RegistryParams {
    pub fn with_windows(mut self, inactive_after: Duration, remove_after: Duration) -> Self {
        self.inactive_after = inactive_after;
        self.remove_after = remove_after;
        self
    }

    pub fn with_intervals(mut self, heartbeat: Duration, cleanup: Duration) -> Self {
        self.heartbeat_interval = heartbeat;
        self.cleanup_interval = cleanup;
        self
    }
}

/// Orchestrator loop control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorParams {
    /// Use the adaptive planner instead of the static one.
    pub adaptive: bool,
    /// Upper bound on executed steps per plan.
    pub max_iterations: usize,
    pub step_timeout: Duration,
}

impl Default for OrchestratorParams {
    fn default() -> Self {
        Self {
            adaptive: true,
            max_iterations: 100,
            step_timeout: Duration::from_secs(300),
        }
    }
}

impl OrchestratorParams {
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }
}

/// Thresholds for the adaptive rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerParams {
    /// More findings than this trigger a triage step.
    pub high_finding_threshold: usize,
    /// Coverage below this triggers test generation.
    pub min_test_coverage: f64,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            high_finding_threshold: 10,
            min_test_coverage: 0.6,
        }
    }
}

/// All coordination parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinationConfig {
    pub bus: BusParams,
    pub registry: RegistryParams,
    pub orchestrator: OrchestratorParams,
    pub planner: PlannerParams,
}
