use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ExitReport;

/// How long to keep delivering buffered output after the process exits.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Errors that prevent a command from starting
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("No command given")]
    EmptyCommand,

    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Commands can only be started inside a Tokio runtime")]
    NoRuntime,
}

/// Which output stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::Stdout => write!(f, "stdout"),
            OutputType::Stderr => write!(f, "stderr"),
        }
    }
}

/// Receives the lines a running command produces.
///
/// Calls for one process never overlap, and none arrive after the exit
/// observer has fired.
pub trait LineSink: Send + 'static {
    fn on_line(&mut self, line: &str, stream: OutputType);

    /// A read on `stream` failed. The other stream keeps going.
    fn on_stream_error(&mut self, stream: OutputType, error: &std::io::Error) {
        self.on_line(
            &format!("[linesift: failed to read {}: {}]", stream, error),
            stream,
        );
    }
}

impl<F> LineSink for F
where
    F: FnMut(&str, OutputType) + Send + 'static,
{
    fn on_line(&mut self, line: &str, stream: OutputType) {
        self(line, stream)
    }
}

/// Told once, last, how the process ended.
pub trait ExitObserver: Send + 'static {
    fn on_exit(self: Box<Self>, report: ExitReport);
}

impl<F> ExitObserver for F
where
    F: FnOnce(ExitReport) + Send + 'static,
{
    fn on_exit(self: Box<Self>, report: ExitReport) {
        (*self)(report)
    }
}

/// Configuration for running commands
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Working directory for the command
    pub working_dir: PathBuf,
    /// Additional environment variables
    pub env_vars: HashMap<String, String>,
    /// Grace period for reading output that is still in the pipes at exit
    pub drain_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_vars: HashMap::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl RunConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}
