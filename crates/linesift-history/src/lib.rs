//! # linesift-history
//!
//! Persistent, deduplicating history of applied filter sets.
//!
//! History is a single JSON file holding an array of
//! `{ "timestamp": string, "filters": [string] }` objects, most recent first.
//! Re-applying a filter set already in the list moves it to the front instead
//! of adding a duplicate.

mod error;
pub mod parser;
pub mod store;
pub mod types;

pub use error::HistoryError;
pub use parser::{parse_history, parse_history_strict, ParsedHistory, SkippedEntry};
pub use store::{HistoryStore, Recorded, DEFAULT_MAX_ENTRIES, HISTORY_FILE_NAME};
pub use types::{append, truncate, HistoryEntry, HistoryList, TIMESTAMP_FORMAT};
