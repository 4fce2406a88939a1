//! Project configuration file support for linesift.
//!
//! Loads configuration from `linesift.toml` in the working directory and
//! merges it with command-line flags. Flags win over the file, the file wins
//! over built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use linesift_history::{HistoryStore, DEFAULT_MAX_ENTRIES};
use linesift_logging::LogFormat;
use linesift_runner::DEFAULT_DRAIN_TIMEOUT;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "linesift.toml";

/// Log level used when neither a flag nor the config file sets one
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Project-level configuration loaded from `linesift.toml`
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// History file location (relative paths are resolved against the
    /// working directory)
    pub history_file: Option<PathBuf>,
    /// Maximum number of remembered filter sets
    pub max_history: Option<usize>,
    /// Default tracing level or `RUST_LOG`-style directives
    pub log_level: Option<String>,
    /// Console log format: pretty, json or compact
    pub log_format: Option<String>,
    /// Directory for the diagnostic log file
    pub log_dir: Option<PathBuf>,
    /// How long `run` keeps reading output after the command exits
    pub drain_timeout_ms: Option<u64>,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub history_file: Option<PathBuf>,
    pub max_history: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub log_dir: Option<PathBuf>,
}

/// Effective settings after merging flags, config file and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub history_file: PathBuf,
    pub max_history: usize,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
    pub drain_timeout: Duration,
}

impl Settings {
    pub fn resolve(
        overrides: Overrides,
        config: Option<ProjectConfig>,
        working_dir: &Path,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();

        let config_format = config
            .log_format
            .as_deref()
            .map(str::parse::<LogFormat>)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Invalid log_format in {}: {}", CONFIG_FILE_NAME, e))?;

        let history_file = overrides
            .history_file
            .or_else(|| config.history_file.map(|p| working_dir.join(p)))
            .unwrap_or_else(HistoryStore::default_path);

        Ok(Self {
            history_file,
            max_history: overrides
                .max_history
                .or(config.max_history)
                .unwrap_or(DEFAULT_MAX_ENTRIES),
            log_level: overrides
                .log_level
                .or(config.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format: overrides.log_format.or(config_format).unwrap_or_default(),
            log_dir: overrides
                .log_dir
                .or_else(|| config.log_dir.map(|p| working_dir.join(p))),
            drain_timeout: config
                .drain_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DRAIN_TIMEOUT),
        })
    }

    pub fn history_store(&self) -> HistoryStore {
        HistoryStore::with_path(self.history_file.clone()).with_max_entries(self.max_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_full_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
history_file = "state/history.json"
max_history = 20
log_level = "debug"
log_format = "compact"
log_dir = "logs"
drain_timeout_ms = 500
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.max_history, Some(20));
        assert_eq!(config.log_format.as_deref(), Some("compact"));
        assert_eq!(config.drain_timeout_ms, Some(500));
    }

    #[test]
    fn test_unknown_field_is_hard_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "colour = \"red\"\n").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = Settings::resolve(Overrides::default(), None, Path::new("/work")).unwrap();
        assert_eq!(settings.history_file, HistoryStore::default_path());
        assert_eq!(settings.max_history, DEFAULT_MAX_ENTRIES);
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert_eq!(settings.log_dir, None);
        assert_eq!(settings.drain_timeout, DEFAULT_DRAIN_TIMEOUT);
    }

    #[test]
    fn test_config_paths_resolve_against_working_dir() {
        let config = ProjectConfig {
            history_file: Some(PathBuf::from("h.json")),
            log_dir: Some(PathBuf::from("logs")),
            ..Default::default()
        };
        let settings =
            Settings::resolve(Overrides::default(), Some(config), Path::new("/work")).unwrap();
        assert_eq!(settings.history_file, PathBuf::from("/work/h.json"));
        assert_eq!(settings.log_dir, Some(PathBuf::from("/work/logs")));
    }

    #[test]
    fn test_flags_override_config() {
        let config = ProjectConfig {
            history_file: Some(PathBuf::from("h.json")),
            max_history: Some(5),
            log_level: Some("debug".to_string()),
            log_format: Some("json".to_string()),
            drain_timeout_ms: Some(10),
            ..Default::default()
        };
        let overrides = Overrides {
            history_file: Some(PathBuf::from("/tmp/other.json")),
            max_history: Some(7),
            log_level: Some("trace".to_string()),
            log_format: Some(LogFormat::Compact),
            log_dir: None,
        };

        let settings = Settings::resolve(overrides, Some(config), Path::new("/work")).unwrap();
        assert_eq!(settings.history_file, PathBuf::from("/tmp/other.json"));
        assert_eq!(settings.max_history, 7);
        assert_eq!(settings.log_level, "trace");
        assert_eq!(settings.log_format, LogFormat::Compact);
        assert_eq!(settings.drain_timeout, Duration::from_millis(10));
        assert_eq!(settings.history_store().max_entries(), 7);
    }

    #[test]
    fn test_invalid_log_format_in_config() {
        let config = ProjectConfig {
            log_format: Some("xml".to_string()),
            ..Default::default()
        };
        let err = Settings::resolve(Overrides::default(), Some(config), Path::new("/work"))
            .unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }
}
