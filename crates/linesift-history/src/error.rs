use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the history store.
///
/// Only [`HistoryStore::save`](crate::HistoryStore::save),
/// [`HistoryStore::save_raw`](crate::HistoryStore::save_raw) and
/// [`HistoryStore::clear`](crate::HistoryStore::clear) surface these to the
/// caller. Loading degrades to an empty list instead.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to {action} history file {}: {source}", path.display())]
    Persistence {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("History is not a JSON array: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Invalid history entry at index {index}: {source}")]
    Parse {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}
