use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use linesift_logging::{init_tracing, LogFormat, Logger};

mod config;
mod filter_cmd;
mod history_cmd;
mod input;
mod run_cmd;

use config::{Overrides, ProjectConfig, Settings};
use filter_cmd::FilterArgs;
use history_cmd::HistoryAction;
use run_cmd::RunArgs;

#[derive(Parser, Debug)]
#[command(
    name = "linesift",
    about = "Filter text by literal include/exclude terms",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// History file (default: <data dir>/linesift/history.json)
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,

    /// Maximum number of remembered filter sets
    #[arg(long, global = true)]
    max_history: Option<usize>,

    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatChoice>,

    /// Also write diagnostics to a file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the lines of a file (or stdin) matching the given terms
    Filter(FilterArgs),

    /// Inspect and reuse remembered filter sets
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Run a command and show only the output lines matching the terms
    Run(RunArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let project_config = ProjectConfig::load(&working_dir)?;

    let overrides = Overrides {
        history_file: cli.history_file,
        max_history: cli.max_history,
        log_level: cli.log_level,
        log_format: cli.log_format.map(Into::into),
        log_dir: cli.log_dir,
    };
    let settings = Settings::resolve(overrides, project_config, &working_dir)?;

    let guard = init_tracing(
        &settings.log_level,
        settings.log_format,
        settings.log_dir.as_deref(),
    );
    let logger = Arc::new(Logger::new(settings.log_format));

    let code = match cli.command {
        Commands::Filter(args) => filter_cmd::handle_filter_command(args, &settings, &logger)?,
        Commands::History { action } => {
            history_cmd::handle_history_command(action, &settings, &logger)?
        }
        Commands::Run(args) => run_cmd::handle_run_command(args, &settings, logger).await?,
    };

    // Flush the log file before exiting
    drop(guard);
    std::process::exit(code);
}
