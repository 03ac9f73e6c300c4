//! Registry liveness configuration from TOML (`[registry]` section)
//!
//! ```toml
//! [registry]
//! heartbeat_interval_ms = 30000   # heartbeat monitor tick
//! inactive_after_ms     = 120000  # silence window before active=false
//! cleanup_interval_ms   = 300000  # cleanup sweep tick
//! remove_after_ms       = 600000  # silence window before unregister
//! ```

use conductor_application::RegistryParams;
use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRegistryConfig {
    pub heartbeat_interval_ms: u64,
    pub inactive_after_ms: u64,
    pub cleanup_interval_ms: u64,
    pub remove_after_ms: u64,
}

impl Default for FileRegistryConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 30_000,
            inactive_after_ms: 120_000,
            cleanup_interval_ms: 300_000,
            remove_after_ms: 600_000,
        }
    }
}

impl FileRegistryConfig {
    pub fn to_params(&self) -> RegistryParams {
        RegistryParams::default()
            .with_intervals(
                Duration::from_millis(self.heartbeat_interval_ms),
                Duration::from_millis(self.cleanup_interval_ms),
            )
            .with_windows(
                Duration::from_millis(self.inactive_after_ms),
                Duration::from_millis(self.remove_after_ms),
            )
    }

    /// Window ordering checks. Zero values are reported by the caller.
    pub(super) fn window_issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.remove_after_ms <= self.inactive_after_ms {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::RemovalBeforeInactive,
                format!(
                    "registry.remove_after_ms ({}) should exceed registry.inactive_after_ms ({}); \
                     agents would be removed as soon as they go inactive",
                    self.remove_after_ms, self.inactive_after_ms
                ),
            ));
        }
        if self.inactive_after_ms < self.heartbeat_interval_ms {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InactiveWindowTooShort,
                format!(
                    "registry.inactive_after_ms ({}) is shorter than registry.heartbeat_interval_ms ({})",
                    self.inactive_after_ms, self.heartbeat_interval_ms
                ),
            ));
        }
        issues
    }
}
