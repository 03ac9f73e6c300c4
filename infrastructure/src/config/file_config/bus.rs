//! Message bus configuration from TOML (`[bus]` section)

use conductor_application::BusParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBusConfig {
    /// Request/response timeout when the caller gives none
    pub default_timeout_ms: u64,
}

impl Default for FileBusConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
        }
    }
}

impl FileBusConfig {
    pub fn to_params(&self) -> BusParams {
        BusParams {
            default_timeout: Duration::from_millis(self.default_timeout_ms),
        }
    }
}
