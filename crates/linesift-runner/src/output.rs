use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{LineSink, OutputType};

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitReport {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Terminating signal, if any (unix only)
    pub signal: Option<i32>,
    /// True when the runner asked the process to stop
    pub killed: bool,
    /// Time from spawn to exit
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl ExitReport {
    /// Check if the command exited on its own with status 0
    pub fn success(&self) -> bool {
        !self.killed && self.code == Some(0)
    }

    /// Shell-style exit status: the code, or 128 + signal.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => -1,
        }
    }
}

/// A sink that keeps every line it receives.
///
/// Clones share the same buffer, so one clone can be handed to the runner
/// and another inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    lines: Arc<Mutex<Vec<(OutputType, String)>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines in delivery order.
    pub fn lines(&self) -> Vec<(OutputType, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn stdout_lines(&self) -> Vec<String> {
        self.stream_lines(OutputType::Stdout)
    }

    pub fn stderr_lines(&self) -> Vec<String> {
        self.stream_lines(OutputType::Stderr)
    }

    fn stream_lines(&self, stream: OutputType) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line)
            .collect()
    }
}

impl LineSink for CapturedOutput {
    fn on_line(&mut self, line: &str, stream: OutputType) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push((stream, line.to_string()));
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
