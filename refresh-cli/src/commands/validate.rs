// Validate the runner configuration

use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use refresh_service::invoke::resolve_program;
use refresh_service::schedule::format_duration;
use refresh_service::RunnerConfig;

/// Check the config file and the environment it points at
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also require the pipeline program to be resolvable right now
    #[arg(long)]
    pub strict: bool,
}

pub fn execute(args: ValidateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = match RunnerConfig::load_or_default(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("{}", e));
            std::process::exit(1);
        }
    };
    output::check("config parses");

    let working_dir = config.resolve_working_dir();
    if working_dir.is_dir() {
        output::check(&format!("working directory exists: {}", working_dir.display()));
    } else {
        output::warning(&format!(
            "working directory does not exist: {}",
            working_dir.display()
        ));
        if args.strict {
            std::process::exit(1);
        }
    }

    match resolve_program(&config.program, &working_dir) {
        Some(path) => output::check(&format!("program resolves: {}", path.display())),
        None => {
            output::warning(&format!("program not resolvable: {}", config.program));
            if args.strict {
                std::process::exit(1);
            }
        }
    }

    match config.timeout {
        Some(timeout) => output::info(&format!("timeout: {}", format_duration(timeout))),
        None => output::warning("no timeout configured; a hung pipeline will block forever"),
    }

    match &config.schedule {
        Some(schedule) => output::info(&format!("schedule: {}", schedule.describe())),
        None => output::info("no schedule declared (trigger owned entirely by the host scheduler)"),
    }

    output::check("configuration valid");
    Ok(())
}
