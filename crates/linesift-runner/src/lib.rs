//! Runs external commands and streams their output line by line.
//!
//! [`ProcessRunner::spawn`] starts a command with stdout and stderr piped,
//! hands each completed line to a [`LineSink`] and reports the exit through an
//! [`ExitObserver`]. The returned [`ProcessHandle`] can ask the command to stop
//! gracefully or kill it when its output is no longer wanted.

mod handle;
mod output;
mod spawner;
mod splitter;
mod traits;

pub use handle::{ProcessHandle, ProcessState, Stopper};
pub use output::{CapturedOutput, ExitReport};
pub use spawner::ProcessRunner;
pub use splitter::LineSplitter;
pub use traits::{
    ExitObserver, LineSink, OutputType, RunConfig, RunnerError, DEFAULT_DRAIN_TIMEOUT,
};
