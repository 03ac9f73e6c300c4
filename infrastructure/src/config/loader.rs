//! Configuration loader with multi-source merging

use super::file_config::FileConfig;
use conductor_domain::ConfigIssue;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory name under the user config dir.
const APP_DIR: &str = "agent-conductor";
/// Project-level config file names, checked in order.
const PROJECT_FILES: [&str; 2] = ["conductor.toml", ".conductor.toml"];
/// Prefix of environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "CONDUCTOR_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ConfigIssue>),
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `CONDUCTOR_*` environment variables (`CONDUCTOR_REGISTRY__REMOVE_AFTER_MS`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./conductor.toml` or `./.conductor.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/agent-conductor/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        let global = Self::global_config_path();
        let project = Self::project_config_path();
        Self::load_layers(global.as_deref(), project.as_deref(), config_path)
    }

    /// Merge the given files (missing ones are skipped, except an explicit
    /// path) and the environment over the defaults.
    pub fn load_layers(
        global: Option<&Path>,
        project: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<FileConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        for path in [global, project].into_iter().flatten() {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Reject configurations with error-level issues; return the warnings.
    pub fn check(config: &FileConfig) -> Result<Vec<ConfigIssue>, ConfigError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            config.validate().into_iter().partition(ConfigIssue::is_error);
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        Self::project_config_in(Path::new("."))
    }

    pub fn project_config_in(dir: &Path) -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Render a configuration as TOML (for --show-config)
    pub fn render(config: &FileConfig) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(config)
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(explicit: Option<&Path>) {
        println!("Configuration sources (in priority order):");
        println!("  [ENV  ] Environment: {}*", ENV_PREFIX);

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "MISS " };
            println!("  [{}] Explicit: {}", mark, path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./conductor.toml or ./.conductor.toml");
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            println!("  [{}] Global:  {}", mark, path.display());
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::ConfigIssueCode;
    use std::fs;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert!(config.orchestrator.adaptive);
        assert_eq!(config.registry.heartbeat_interval_ms, 30_000);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR));
    }

    #[test]
    fn test_layers_override_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("conductor.toml");
        let explicit = dir.path().join("explicit.toml");

        fs::write(
            &global,
            "[registry]\nheartbeat_interval_ms = 1000\ninactive_after_ms = 5000\n",
        )
        .unwrap();
        fs::write(&project, "[registry]\ninactive_after_ms = 7000\n").unwrap();
        fs::write(&explicit, "[orchestrator]\nmax_iterations = 9\n").unwrap();

        let config =
            ConfigLoader::load_layers(Some(&global), Some(&project), Some(&explicit)).unwrap();
        assert_eq!(config.registry.heartbeat_interval_ms, 1000);
        assert_eq!(config.registry.inactive_after_ms, 7000);
        assert_eq!(config.orchestrator.max_iterations, 9);
        // Untouched sections keep defaults
        assert_eq!(config.bus.default_timeout_ms, 30_000);
    }

    #[test]
    fn test_missing_optional_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ConfigLoader::load_layers(Some(&dir.path().join("nope.toml")), None, None).unwrap();
        assert_eq!(config.planner.high_finding_threshold, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = ConfigLoader::load_layers(None, None, Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == missing));
    }

    #[test]
    fn test_malformed_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[orchestrator]\nmax_iterations = \"many\"\n").unwrap();
        let err = ConfigLoader::load_layers(None, None, Some(&bad)).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_project_config_discovery() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigLoader::project_config_in(dir.path()).is_none());

        fs::write(dir.path().join(".conductor.toml"), "").unwrap();
        assert_eq!(
            ConfigLoader::project_config_in(dir.path()),
            Some(dir.path().join(".conductor.toml"))
        );

        fs::write(dir.path().join("conductor.toml"), "").unwrap();
        assert_eq!(
            ConfigLoader::project_config_in(dir.path()),
            Some(dir.path().join("conductor.toml"))
        );
    }

    #[test]
    fn test_check_splits_errors_and_warnings() {
        let mut config = FileConfig::default();
        config.planner.min_test_coverage = 2.0;
        let warnings = ConfigLoader::check(&config).unwrap();
        assert_eq!(warnings[0].code, ConfigIssueCode::ThresholdOutOfRange);

        config.orchestrator.step_timeout_ms = 0;
        let err = ConfigLoader::check(&config).unwrap_err();
        assert!(err.to_string().contains("orchestrator.step_timeout_ms"));
    }

    #[test]
    fn test_render_round_trips() {
        let rendered = ConfigLoader::render(&FileConfig::default()).unwrap();
        assert!(rendered.contains("[registry]"));
        let parsed: FileConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, FileConfig::default());
    }
}
