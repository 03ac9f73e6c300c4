//! Output format value object

use serde::{Deserialize, Serialize};

/// Rendering of plans, run results and agent listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    /// JSON output owns stdout; progress lines must not be mixed in.
    pub fn is_machine_readable(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_value_names() {
        let format: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert!(format.is_machine_readable());
        assert_eq!(serde_json::to_string(&OutputFormat::Text).unwrap(), "\"text\"");
        assert!(!OutputFormat::default().is_machine_readable());
    }
}
