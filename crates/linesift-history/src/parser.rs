use serde_json::Value;
use tracing::warn;

use crate::error::HistoryError;
use crate::types::{HistoryEntry, HistoryList};

/// An entry dropped while reading history leniently.
#[derive(Debug)]
pub struct SkippedEntry {
    pub index: usize,
    pub reason: String,
}

/// Result of a lenient parse: the valid entries plus what was dropped.
#[derive(Debug, Default)]
pub struct ParsedHistory {
    pub entries: HistoryList,
    pub skipped: Vec<SkippedEntry>,
}

/// Parse history text, dropping entries that do not match the record shape.
///
/// Fails only when the text as a whole is not a JSON array. Blank text is an
/// empty history.
pub fn parse_history(text: &str) -> Result<ParsedHistory, HistoryError> {
    let mut parsed = ParsedHistory::default();
    for (index, value) in top_level_values(text)?.into_iter().enumerate() {
        match serde_json::from_value::<HistoryEntry>(value) {
            Ok(entry) => parsed.entries.push(entry),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed history entry");
                parsed.skipped.push(SkippedEntry {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(parsed)
}

/// Parse history text, rejecting it if any entry is malformed.
///
/// Used when saving hand-edited history so a partially broken list is never
/// written back.
pub fn parse_history_strict(text: &str) -> Result<HistoryList, HistoryError> {
    top_level_values(text)?
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value::<HistoryEntry>(value)
                .map_err(|source| HistoryError::Parse { index, source })
        })
        .collect()
}

fn top_level_values(text: &str) -> Result<Vec<Value>, HistoryError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<Value>>(text).map_err(HistoryError::Malformed)
}
