// Pipeline Invocation
// Spawns the external pipeline program, streams its output, and maps the
// termination status onto a runner outcome

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Callback for handling output lines in real-time; the second argument
/// is `true` for stderr lines
pub type OutputCallback = Box<dyn Fn(&str, bool) + Send + Sync>;

/// One invocation of the external pipeline program
#[derive(Debug, Clone)]
pub struct InvokeSpec {
    /// Program to execute: a bare name resolved on PATH, or a path
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Working directory for the child process
    pub working_dir: PathBuf,
    /// Bound on how long the child may run (None = unbounded)
    pub timeout: Option<Duration>,
}

/// Terminal state of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The pipeline exited 0
    Succeeded,
    /// The pipeline ran and exited non-zero
    Failed { exit_code: i32 },
    /// The program could not be located or executed
    NotFound,
    /// The timeout expired and the child was killed
    Timeout,
    /// The child was terminated by a signal and reported no exit code
    Killed,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }

    /// Exit code the runner itself should report for this outcome.
    ///
    /// A non-zero pipeline exit code is propagated verbatim; the runner's
    /// own failure kinds use the conventional shell codes (127 for
    /// command-not-found, 124 for timed-out).
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Succeeded => 0,
            Outcome::Failed { exit_code } => *exit_code,
            Outcome::NotFound => 127,
            Outcome::Timeout => 124,
            Outcome::Killed => 1,
        }
    }
}

/// Record of a completed invocation
#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub outcome: Outcome,
    pub program: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

/// Execute the pipeline program and wait for a terminal state.
///
/// The child inherits the runner's environment, runs from
/// `spec.working_dir`, and has stdout/stderr streamed line-by-line to
/// `on_output` when a callback is given. This function never returns an
/// error: every failure mode is a terminal [`Outcome`].
pub async fn run(spec: &InvokeSpec, on_output: Option<OutputCallback>) -> InvocationReport {
    let started_at = Utc::now();
    let started = Instant::now();

    let report = |outcome: Outcome, duration: Duration| InvocationReport {
        outcome,
        program: spec.program.clone(),
        started_at,
        duration,
    };

    // Resolve a bare program name on PATH up front so a missing
    // interpreter is reported as not-found rather than a spawn error.
    let program: PathBuf = if spec.program.contains(std::path::MAIN_SEPARATOR) {
        // Relative program paths resolve against the runner's working
        // directory, not the caller's cwd.
        let path = PathBuf::from(&spec.program);
        if path.is_absolute() {
            path
        } else {
            spec.working_dir.join(path)
        }
    } else {
        match which::which(&spec.program) {
            Ok(path) => path,
            Err(_) => {
                warn!(program = %spec.program, "pipeline program not found on PATH");
                return report(Outcome::NotFound, started.elapsed());
            }
        }
    };

    debug!(
        program = %program.display(),
        working_dir = %spec.working_dir.display(),
        "spawning pipeline"
    );

    let mut cmd = Command::new(&program);
    cmd.args(&spec.args);
    cmd.current_dir(&spec.working_dir);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %program.display(), error = %e, "failed to spawn pipeline");
            return report(Outcome::NotFound, started.elapsed());
        }
    };

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let on_output = on_output.map(std::sync::Arc::new);
    let on_stdout = on_output.clone();
    let on_stderr = on_output;

    let stdout_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(cb) = &on_stdout {
                cb(&line, false);
            }
        }
    });

    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(cb) = &on_stderr {
                cb(&line, true);
            }
        }
    });

    // Wait for completion with optional timeout
    let wait_result = if let Some(timeout) = spec.timeout {
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?timeout, "pipeline timed out, killing child");
                let _ = child.kill().await;
                let _ = stdout_handle.await;
                let _ = stderr_handle.await;
                return report(Outcome::Timeout, started.elapsed());
            }
        }
    } else {
        child.wait().await
    };

    let _ = stdout_handle.await;
    let _ = stderr_handle.await;

    let duration = started.elapsed();
    let outcome = match wait_result {
        Ok(status) => match status.code() {
            Some(0) => Outcome::Succeeded,
            Some(exit_code) => Outcome::Failed { exit_code },
            None => Outcome::Killed,
        },
        Err(e) => {
            warn!(error = %e, "failed to wait on pipeline child");
            Outcome::Killed
        }
    };

    debug!(?outcome, elapsed_ms = duration.as_millis() as u64, "pipeline finished");
    report(outcome, duration)
}

/// Check that the program the spec names can actually be executed,
/// without running it. Used by `validate`.
pub fn resolve_program(program: &str, working_dir: &Path) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = working_dir.join(program);
        return path.is_file().then_some(path);
    }
    which::which(program).ok()
}
