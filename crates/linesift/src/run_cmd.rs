use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::oneshot;
use tracing::debug;

use linesift_core::{Clock, FilterSpec, SystemClock};
use linesift_history::HistoryEntry;
use linesift_logging::{LogEvent, Logger};
use linesift_runner::{ExitReport, OutputType, ProcessRunner, RunConfig, Stopper};

use crate::config::Settings;

/// Exit code reported when the user stopped the command.
pub const STOPPED_EXIT_CODE: i32 = 130;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Term to match (repeatable); prefix with `!` to exclude
    #[arg(short = 't', long = "term", allow_hyphen_values = true)]
    pub terms: Vec<String>,

    /// Command to run, followed by its arguments
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Run a command, printing only the output lines that pass the filters.
///
/// Ctrl+C asks the command to stop; a second Ctrl+C kills it.
pub async fn handle_run_command(
    args: RunArgs,
    settings: &Settings,
    logger: Arc<Logger>,
) -> Result<i32> {
    let spec = FilterSpec::parse(&args.terms);
    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let runner = ProcessRunner::new(
        RunConfig::new(working_dir).with_drain_timeout(settings.drain_timeout),
    );

    let (tx, rx) = oneshot::channel();
    let handle = runner
        .spawn(
            &args.command,
            FilteredPrinter::new(spec.clone()),
            move |report: ExitReport| {
                let _ = tx.send(report);
            },
        )
        .with_context(|| format!("Failed to run {}", args.command.join(" ")))?;

    let interrupts = Interrupts::new(handle.stopper(), logger.clone());
    ctrlc::set_handler(move || interrupts.press()).context("Failed to set Ctrl+C handler")?;

    logger.log(&LogEvent::CommandStarted {
        argv: args.command.clone(),
        pid: handle.pid(),
    });

    let recorded = settings
        .history_store()
        .record(history_entry(&spec, &SystemClock));
    if let Some(warning) = recorded.warning {
        logger.log(&LogEvent::HistoryWarning {
            error: warning.to_string(),
        });
    }

    let report = match rx.await {
        Ok(report) => report,
        Err(_) => handle.wait().await,
    };
    debug!(killed = report.killed, code = ?report.code, "Command finished");

    logger.log(&LogEvent::CommandExited {
        code: report.code,
        signal: report.signal,
        killed: report.killed,
        duration_secs: report.duration.as_secs_f64(),
    });

    Ok(exit_code(&report))
}

fn history_entry(spec: &FilterSpec, clock: &impl Clock) -> HistoryEntry {
    HistoryEntry::new(clock.now(), spec.to_raw())
}

/// Ctrl+C presses during a run: the first asks the command to stop, any
/// later one kills it.
struct Interrupts {
    presses: AtomicUsize,
    stopper: Stopper,
    logger: Arc<Logger>,
}

impl Interrupts {
    fn new(stopper: Stopper, logger: Arc<Logger>) -> Self {
        Self {
            presses: AtomicUsize::new(0),
            stopper,
            logger,
        }
    }

    fn press(&self) {
        if self.presses.fetch_add(1, Ordering::SeqCst) == 0 {
            self.logger.log(&LogEvent::CommandStopping { force: false });
            self.stopper.request_stop();
        } else {
            self.logger.log(&LogEvent::CommandStopping { force: true });
            self.stopper.detach();
        }
    }
}

/// Map how the command ended to our own exit code.
pub fn exit_code(report: &ExitReport) -> i32 {
    if report.killed {
        STOPPED_EXIT_CODE
    } else {
        match report.exit_code() {
            code if code < 0 => 1,
            code => code,
        }
    }
}

/// Prints lines passing the filter, stdout lines to stdout and stderr lines
/// to stderr.
struct FilteredPrinter {
    spec: FilterSpec,
}

impl FilteredPrinter {
    fn new(spec: FilterSpec) -> Self {
        Self { spec }
    }
}

impl linesift_runner::LineSink for FilteredPrinter {
    fn on_line(&mut self, line: &str, stream: OutputType) {
        if !self.spec.matches(line) {
            return;
        }
        // A closed pipe on our side is not the command's problem.
        let _ = match stream {
            OutputType::Stdout => writeln!(std::io::stdout().lock(), "{}", line),
            OutputType::Stderr => writeln!(std::io::stderr().lock(), "{}", line),
        };
    }
}
