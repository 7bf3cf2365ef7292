// refresh-runner
// Supervises the scheduled data-refresh pipeline: runs it once, reports
// success or failure through a status line and the process exit code.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "refresh-runner",
    version,
    about = "Supervises the scheduled dashboard data-refresh pipeline"
)]
struct Cli {
    /// Path to the config file (default: refresh.yaml beside the executable)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once and report its outcome
    Run(commands::run::RunArgs),
    /// Check the config file without running anything
    Validate(commands::validate::ValidateArgs),
    /// Show the configured trigger schedule
    Schedule(commands::schedule::ScheduleArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        // Zero arguments means run, so the OS scheduler needs no flags.
        None => commands::run::execute(commands::run::RunArgs::default(), cli.config).await,
        Some(Command::Run(args)) => commands::run::execute(args, cli.config).await,
        Some(Command::Validate(args)) => commands::validate::execute(args, cli.config),
        Some(Command::Schedule(args)) => commands::schedule::execute(args, cli.config),
    }
}
