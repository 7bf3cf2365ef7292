// Status Report
// Optional JSON document describing the most recent invocation

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RunnerError;
use crate::invoke::{InvocationReport, Outcome};

/// Machine-readable record of the last run, written when the config
/// names a `status_file`. Gives schedulers and monitoring something
/// richer than the exit code without changing the exit-code contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// Terminal state of the invocation
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Exit code the runner reported to its caller
    pub runner_exit_code: i32,
    /// Program that was invoked
    pub program: String,
    /// When the invocation started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the invocation
    pub duration_secs: f64,
}

impl StatusReport {
    pub fn from_invocation(report: &InvocationReport) -> Self {
        Self {
            outcome: report.outcome,
            runner_exit_code: report.outcome.exit_code(),
            program: report.program.clone(),
            started_at: report.started_at,
            duration_secs: report.duration.as_secs_f64(),
        }
    }

    /// Write the report atomically: serialize to a sibling temp file,
    /// then rename over the target so readers never see a partial file.
    pub fn write(&self, path: &Path) -> Result<(), RunnerError> {
        let io_err = |source| RunnerError::Report {
            path: path.to_path_buf(),
            source,
        };

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json.as_bytes()).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;

        debug!(path = %path.display(), "wrote status report");
        Ok(())
    }

    /// Read back a previously written report.
    pub fn read(path: &Path) -> Result<Self, RunnerError> {
        let contents = fs::read_to_string(path).map_err(|source| RunnerError::Report {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|e| RunnerError::Report {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    fn sample(outcome: Outcome) -> InvocationReport {
        InvocationReport {
            outcome,
            program: "python3".to_string(),
            started_at: Utc::now(),
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("last_run.json");

        let report = StatusReport::from_invocation(&sample(Outcome::Failed { exit_code: 3 }));
        report.write(&path).unwrap();

        let back = StatusReport::read(&path).unwrap();
        assert_eq!(back.outcome, Outcome::Failed { exit_code: 3 });
        assert_eq!(back.runner_exit_code, 3);
        assert_eq!(back.program, "python3");
        assert!((back.duration_secs - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("last_run.json");

        StatusReport::from_invocation(&sample(Outcome::Succeeded))
            .write(&path)
            .unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("last_run.json")]);
    }

    #[test]
    fn test_json_shape() {
        let report = StatusReport::from_invocation(&sample(Outcome::Timeout));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"kind\":\"timeout\""));
        assert!(json.contains("\"runner_exit_code\":124"));
    }

    #[test]
    fn test_read_missing_file() {
        let err = StatusReport::read(Path::new("/nonexistent/last_run.json")).unwrap_err();
        assert!(matches!(err, RunnerError::Report { .. }));
    }
}
