// Run the pipeline once

use crate::output;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use color_eyre::Result;

use refresh_service::invoke::{self, InvokeSpec, Outcome, OutputCallback};
use refresh_service::lock::{LockError, RunLock};
use refresh_service::report::StatusReport;
use refresh_service::schedule::{format_duration, parse_duration};
use refresh_service::RunnerConfig;

/// Exit code when a trigger is skipped because a run is already in
/// progress; distinct from every failure code so schedulers can tell
/// skip from failure (EX_TEMPFAIL).
pub const EXIT_SKIPPED: i32 = 75;

/// Run the data-refresh pipeline once and report its outcome
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Override the pipeline program from the config
    #[arg(long, value_name = "PROGRAM")]
    pub program: Option<String>,

    /// Override the invocation timeout ("90s", "30m", "2h")
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Skip the overlap lock (for supervised re-runs)
    #[arg(long)]
    pub no_lock: bool,
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = RunnerConfig::load_or_default(config_path.as_deref())?;

    if let Some(program) = args.program {
        config.program = program;
    }
    if let Some(timeout) = &args.timeout {
        config.timeout = Some(parse_duration(timeout)?);
    }

    let working_dir = config.resolve_working_dir();

    // Overlap guard: a second trigger while a run is in progress skips,
    // it does not queue.
    let lock = if args.no_lock {
        None
    } else {
        let lock_path = config.resolve_lock_file();
        match RunLock::acquire(&lock_path) {
            Ok(lock) => Some(lock),
            Err(LockError::AlreadyHeld { pid }) => {
                output::warning(&format!(
                    "Pipeline run already in progress (pid {}), skipping this trigger",
                    pid
                ));
                std::process::exit(EXIT_SKIPPED);
            }
            Err(e) => return Err(e.into()),
        }
    };

    let spec = InvokeSpec {
        program: config.program.clone(),
        args: config.args.clone(),
        working_dir,
        timeout: config.timeout,
    };

    output::status(
        "Running",
        &format!("{} {}", spec.program, spec.args.join(" ")),
    );

    let callback: OutputCallback = Box::new(|line, is_err| {
        if is_err {
            output::pipeline_error(line);
        } else {
            output::pipeline_output(line);
        }
    });

    let report = invoke::run(&spec, Some(callback)).await;

    if let Some(status_path) = &config.status_file {
        if let Err(e) = StatusReport::from_invocation(&report).write(status_path) {
            output::warning(&format!("{}", e));
        }
    }

    // Release before exiting; process::exit skips destructors.
    drop(lock);

    let line = report_line(&report.outcome, &spec.program, config.timeout);
    match report.outcome {
        Outcome::Succeeded => {
            output::success(&line);
            Ok(())
        }
        outcome => {
            output::failure(&line);
            std::process::exit(outcome.exit_code());
        }
    }
}

/// The runner's terminal status line for a given outcome.
fn report_line(outcome: &Outcome, program: &str, timeout: Option<Duration>) -> String {
    match outcome {
        Outcome::Succeeded => "Pipeline completed successfully".to_string(),
        Outcome::Failed { exit_code } => {
            format!("Pipeline failed with error code {}", exit_code)
        }
        Outcome::NotFound => format!("Pipeline program not found: {}", program),
        Outcome::Timeout => {
            let limit = timeout
                .map(format_duration)
                .unwrap_or_else(|| "?".to_string());
            format!("Pipeline timed out after {}", limit)
        }
        Outcome::Killed => "Pipeline terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_line_success() {
        let line = report_line(&Outcome::Succeeded, "python3", None);
        assert_eq!(line, "Pipeline completed successfully");
    }

    #[test]
    fn test_report_line_failure_includes_exit_code() {
        let line = report_line(&Outcome::Failed { exit_code: 1 }, "python3", None);
        assert_eq!(line, "Pipeline failed with error code 1");

        let line = report_line(&Outcome::Failed { exit_code: 42 }, "python3", None);
        assert!(line.contains("42"));
    }

    #[test]
    fn test_report_line_not_found_names_program() {
        let line = report_line(&Outcome::NotFound, "python3", None);
        assert!(line.contains("not found"));
        assert!(line.contains("python3"));
    }

    #[test]
    fn test_report_line_timeout_names_limit() {
        let line = report_line(
            &Outcome::Timeout,
            "python3",
            Some(Duration::from_secs(7200)),
        );
        assert_eq!(line, "Pipeline timed out after 2h");
    }

    #[test]
    fn test_report_line_distinct_per_outcome() {
        let outcomes = [
            Outcome::Succeeded,
            Outcome::Failed { exit_code: 1 },
            Outcome::NotFound,
            Outcome::Timeout,
            Outcome::Killed,
        ];
        let lines: Vec<String> = outcomes
            .iter()
            .map(|o| report_line(o, "python3", Some(Duration::from_secs(60))))
            .collect();
        for (i, a) in lines.iter().enumerate() {
            for b in &lines[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
