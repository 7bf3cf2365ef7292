// Runner Configuration
// Loads refresh.yaml and fills in defaults for anything unspecified

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::schedule::{parse_duration, Schedule};
use crate::utils;

/// Default pipeline interpreter
pub const DEFAULT_PROGRAM: &str = "python3";

/// Default pipeline entry point, resolved relative to the working directory
pub const DEFAULT_ENTRY_POINT: &str = "covid_automation_main.py";

/// Config file name looked up beside the runner executable
pub const CONFIG_FILE_NAME: &str = "refresh.yaml";

/// Default bound on a single invocation; the pipeline normally finishes
/// in minutes, so anything past this is treated as hung.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 3600);

/// Configuration for one runner execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunnerConfig {
    /// Program to execute (bare name resolved on PATH, or a path)
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Working directory for the invocation; defaults to the directory
    /// containing the runner executable
    pub working_dir: Option<PathBuf>,

    /// Bound on how long one invocation may run ("90s", "30m", "2h")
    #[serde(
        deserialize_with = "de_opt_duration",
        serialize_with = "ser_opt_duration"
    )]
    pub timeout: Option<Duration>,

    /// Lock file guarding against overlapping invocations
    pub lock_file: Option<PathBuf>,

    /// Expected host-scheduler trigger, kept here so it is inspectable
    pub schedule: Option<Schedule>,

    /// When set, a JSON status report is written here after every run
    pub status_file: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: vec![DEFAULT_ENTRY_POINT.to_string()],
            working_dir: None,
            timeout: Some(DEFAULT_TIMEOUT),
            lock_file: None,
            schedule: None,
            status_file: None,
        }
    }
}

impl RunnerConfig {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&source).map_err(|e| ConfigError::from_yaml_error(path, &e))
    }

    /// Resolve the config for this execution.
    ///
    /// An explicit path must exist and parse. Otherwise `refresh.yaml`
    /// beside the runner executable is used when present, and built-in
    /// defaults when it is not.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(dir) = utils::exe_dir() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                debug!(path = %candidate.display(), "loading config beside executable");
                return Self::load(&candidate);
            }
        }
        Ok(Self::default())
    }

    /// Working directory for the invocation: the configured override, or
    /// the directory containing the runner executable. Relative paths in
    /// the invoked pipeline resolve here regardless of the caller's cwd.
    pub fn resolve_working_dir(&self) -> PathBuf {
        utils::resolve_working_dir(self.working_dir.as_deref())
    }

    /// Lock file path: the configured override, or a fixed name under the
    /// user runtime directory (falling back to the system temp directory).
    pub fn resolve_lock_file(&self) -> PathBuf {
        if let Some(path) = &self.lock_file {
            return path.clone();
        }
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("refresh-runner.lock")
    }
}

/// Configuration error with source location when available
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path} at line {line}, column {column}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid duration '{0}': expected an integer with a s/m/h/d suffix, like \"30m\"")]
    InvalidDuration(String),
}

impl ConfigError {
    fn from_yaml_error(path: &Path, err: &serde_yaml::Error) -> Self {
        let (line, column) = err
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((1, 1));
        ConfigError::Parse {
            path: path.to_path_buf(),
            line,
            column,
            message: err.to_string(),
        }
    }
}

fn de_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(s) => parse_duration(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

fn ser_opt_duration<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        None => serializer.serialize_none(),
        Some(d) => serializer.serialize_some(&crate::schedule::format_duration(*d)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use chrono::NaiveTime;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.program, "python3");
        assert_eq!(config.args, vec!["covid_automation_main.py".to_string()]);
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT));
        assert!(config.schedule.is_none());
        assert!(config.status_file.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
program: python3
args: ["covid_automation_main.py"]
working_dir: /opt/dashboard
timeout: 45m
lock_file: /tmp/dashboard-refresh.lock
schedule:
  daily:
    at: "06:30"
status_file: /opt/dashboard/last_run.json
"#;
        let config: RunnerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.working_dir, Some(PathBuf::from("/opt/dashboard")));
        assert_eq!(config.timeout, Some(Duration::from_secs(45 * 60)));
        assert_eq!(
            config.schedule,
            Some(Schedule::Daily {
                at: NaiveTime::from_hms_opt(6, 30, 0).unwrap()
            })
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: RunnerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.program, RunnerConfig::default().program);
        assert_eq!(config.timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<RunnerConfig, _> = serde_yaml::from_str("programm: python3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_timeout_reported_with_value() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("refresh.yaml");
        fs::write(&path, "timeout: soon\n").unwrap();

        let err = RunnerConfig::load(&path).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("soon"), "unexpected error: {message}");
    }

    #[test]
    fn test_load_missing_file() {
        let err = RunnerConfig::load(Path::new("/nonexistent/refresh.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_parse_error_carries_location() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("refresh.yaml");
        fs::write(&path, "program:\n  - not\n  - a\n  - string\n").unwrap();

        match RunnerConfig::load(&path).unwrap_err() {
            ConfigError::Parse { line, .. } => assert!(line >= 1),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_working_dir_prefers_override() {
        let config = RunnerConfig {
            working_dir: Some(PathBuf::from("/opt/dashboard")),
            ..Default::default()
        };
        assert_eq!(config.resolve_working_dir(), PathBuf::from("/opt/dashboard"));
    }

    #[test]
    fn test_resolve_lock_file_override() {
        let config = RunnerConfig {
            lock_file: Some(PathBuf::from("/tmp/custom.lock")),
            ..Default::default()
        };
        assert_eq!(config.resolve_lock_file(), PathBuf::from("/tmp/custom.lock"));
    }

    #[test]
    fn test_config_yaml_round_trip() {
        let config = RunnerConfig {
            timeout: Some(Duration::from_secs(1800)),
            schedule: Some(Schedule::Every {
                interval: Duration::from_secs(21_600),
            }),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: RunnerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.timeout, config.timeout);
        assert_eq!(back.schedule, config.schedule);
    }
}
