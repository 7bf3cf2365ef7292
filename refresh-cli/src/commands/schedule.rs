// Show the configured trigger schedule

use crate::output;

use std::path::PathBuf;

use chrono::Local;
use clap::Args;
use color_eyre::Result;

use refresh_service::RunnerConfig;

/// Print the declared schedule, its next fire times, and the cron line
/// to register with the host scheduler
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Number of upcoming fire times to print
    #[arg(long, default_value_t = 3, value_name = "N")]
    pub next: usize,

    /// Print only the cron expression (for piping into crontab)
    #[arg(long)]
    pub cron: bool,
}

pub fn execute(args: ScheduleArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = RunnerConfig::load_or_default(config_path.as_deref())?;

    let Some(schedule) = &config.schedule else {
        output::warning("no schedule declared in the config");
        std::process::exit(1);
    };

    if args.cron {
        match schedule.to_cron_expr() {
            Some(expr) => {
                println!("{}", expr);
                return Ok(());
            }
            None => {
                output::error("schedule is not expressible as a single cron line");
                std::process::exit(1);
            }
        }
    }

    output::info(&format!("schedule: {}", schedule.describe()));

    let mut t = Local::now();
    for _ in 0..args.next {
        t = schedule.next_after(&t);
        println!("  next: {}", t.format("%Y-%m-%d %H:%M:%S %Z"));
    }

    match schedule.to_cron_expr() {
        Some(expr) => output::info(&format!("cron: {}", expr)),
        None => output::warning(
            "not expressible as a single cron line; register a systemd timer instead",
        ),
    }

    Ok(())
}
