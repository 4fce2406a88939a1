use linesift_history::HistoryError;

use crate::session::FilterSession;

/// Result of applying filters to a source.
#[derive(Debug)]
pub struct FilterOutcome {
    /// Matching lines, in source order.
    pub lines: Vec<String>,
    /// Number of lines the source had.
    pub total_lines: usize,
    pub session: FilterSession,
    /// Set when the history could not be written. Filtering itself succeeded.
    pub history_warning: Option<HistoryError>,
}

impl FilterOutcome {
    pub fn matched(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Exit code for command-line use: 0 when something matched, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_empty() {
            1
        } else {
            0
        }
    }
}
