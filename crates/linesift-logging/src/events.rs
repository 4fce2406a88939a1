use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// User-facing events emitted while filtering and running commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    FilterApplied {
        source: String,
        terms: Vec<String>,
        matched: usize,
        total: usize,
    },
    /// History could not be persisted; the result itself is still valid
    HistoryWarning {
        error: String,
    },
    CommandStarted {
        argv: Vec<String>,
        pid: Option<u32>,
    },
    CommandStopping {
        force: bool,
    },
    CommandExited {
        code: Option<i32>,
        signal: Option<i32>,
        killed: bool,
        duration_secs: f64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for linesift events - writes to stderr and optionally to a file
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger that also appends JSON events to `log_path`
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // The file always gets JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", event.with_timestamp());
            }
        }

        if let Some(line) = self.render(event) {
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    /// The console text for `event`, or `None` if it cannot be serialized.
    pub fn render(&self, event: &LogEvent) -> Option<String> {
        match self.format {
            LogFormat::Json => serde_json::to_string(event).ok(),
            LogFormat::Pretty => Some(Self::render_pretty(event)),
            LogFormat::Compact => Some(Self::render_compact(event)),
        }
    }

    fn render_pretty(event: &LogEvent) -> String {
        match event {
            LogEvent::FilterApplied {
                source,
                terms,
                matched,
                total,
            } => {
                let terms = if terms.is_empty() {
                    "(no filters)".dimmed().to_string()
                } else {
                    terms.join(", ").bright_white().to_string()
                };
                let count = format!("{}/{} lines", matched, total);
                let count = if *matched == 0 {
                    count.bright_yellow()
                } else {
                    count.bright_green()
                };
                format!(
                    "{} {} {} {} {}",
                    "▶".bright_cyan(),
                    source.bold(),
                    "│".dimmed(),
                    terms,
                    count
                )
            }
            LogEvent::HistoryWarning { error } => {
                format!(
                    "{} History not saved: {}",
                    "⚠".bright_yellow(),
                    error.bright_yellow()
                )
            }
            LogEvent::CommandStarted { argv, pid } => {
                let pid = pid.map(|p| format!(" (pid {})", p)).unwrap_or_default();
                format!(
                    "{} {}{}",
                    "▶".bright_cyan(),
                    argv.join(" ").bold(),
                    pid.dimmed()
                )
            }
            LogEvent::CommandStopping { force } => {
                if *force {
                    format!("{} Killing command", "✗".bright_red())
                } else {
                    format!(
                        "{} Stopping command {}",
                        "■".bright_yellow(),
                        "(Ctrl+C again to kill)".dimmed()
                    )
                }
            }
            LogEvent::CommandExited {
                code,
                signal,
                killed,
                duration_secs,
            } => {
                let status = match (code, signal) {
                    (Some(code), _) => format!("exit {}", code),
                    (None, Some(signal)) => format!("signal {}", signal),
                    (None, None) => "unknown status".to_string(),
                };
                if *killed {
                    format!(
                        "{} Stopped, {} ({:.1}s)",
                        "■".bright_yellow(),
                        status,
                        duration_secs
                    )
                } else if *code == Some(0) {
                    format!("{} Done ({:.1}s)", "✓".bright_green(), duration_secs)
                } else {
                    format!(
                        "{} {} ({:.1}s)",
                        "✗".bright_red(),
                        status.bright_red(),
                        duration_secs
                    )
                }
            }
        }
    }

    fn render_compact(event: &LogEvent) -> String {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        match event {
            LogEvent::FilterApplied {
                source,
                terms,
                matched,
                total,
            } => format!(
                "[{}] filter:{} [{}] {}/{}",
                timestamp,
                source,
                terms.join(","),
                matched,
                total
            ),
            LogEvent::HistoryWarning { error } => {
                format!("[{}] history:warn {}", timestamp, error)
            }
            LogEvent::CommandStarted { argv, pid } => match pid {
                Some(pid) => format!("[{}] run:start:{} {}", timestamp, pid, argv.join(" ")),
                None => format!("[{}] run:start {}", timestamp, argv.join(" ")),
            },
            LogEvent::CommandStopping { force } => {
                let how = if *force { "kill" } else { "stop" };
                format!("[{}] run:{}", timestamp, how)
            }
            LogEvent::CommandExited {
                code,
                signal,
                killed,
                duration_secs,
            } => {
                let status = match (code, signal) {
                    (Some(code), _) => format!("exit={}", code),
                    (None, Some(signal)) => format!("signal={}", signal),
                    (None, None) => "exit=?".to_string(),
                };
                let outcome = if *killed { "killed" } else { "done" };
                format!(
                    "[{}] run:{} {} {:.1}s",
                    timestamp, outcome, status, duration_secs
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied() -> LogEvent {
        LogEvent::FilterApplied {
            source: "app.log".to_string(),
            terms: vec!["error".to_string(), "!retry".to_string()],
            matched: 2,
            total: 10,
        }
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_json_render_is_tagged() {
        let logger = Logger::new(LogFormat::Json);
        let line = logger.render(&applied()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "filter_applied");
        assert_eq!(value["matched"], 2);
        assert_eq!(value["terms"][1], "!retry");
    }

    #[test]
    fn test_compact_render() {
        let logger = Logger::new(LogFormat::Compact);
        let line = logger.render(&applied()).unwrap();
        assert!(line.ends_with("filter:app.log [error,!retry] 2/10"));

        let line = logger
            .render(&LogEvent::CommandExited {
                code: None,
                signal: Some(15),
                killed: true,
                duration_secs: 1.5,
            })
            .unwrap();
        assert!(line.ends_with("run:killed signal=15 1.5s"));
    }

    #[test]
    fn test_pretty_render_mentions_source() {
        colored::control::set_override(false);
        let logger = Logger::new(LogFormat::Pretty);
        let line = logger.render(&applied()).unwrap();
        assert!(line.contains("app.log"));
        assert!(line.contains("error, !retry"));
        assert!(line.contains("2/10 lines"));
    }

    #[test]
    fn test_file_mirror_writes_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&applied());
        logger.log(&LogEvent::CommandStopping { force: false });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "filter_applied");
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["event"], "command_stopping");
        assert_eq!(lines[1]["force"], false);
    }
}
