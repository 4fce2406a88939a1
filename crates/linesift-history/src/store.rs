use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::HistoryError;
use crate::parser::{parse_history, parse_history_strict};
use crate::types::{append, truncate, HistoryEntry, HistoryList};

/// Default cap on the number of remembered filter sets.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// File name of the history store inside the data directory.
pub const HISTORY_FILE_NAME: &str = "history.json";

/// Result of recording a new entry.
///
/// The updated list is always returned; `warning` is set when it could not be
/// written back to disk.
#[derive(Debug)]
pub struct Recorded {
    pub history: HistoryList,
    pub warning: Option<HistoryError>,
}

/// Provides access to the history file on disk.
///
/// The whole file is read and rewritten on every change. There is no
/// cross-process locking, so concurrent writers lose updates to whichever
/// saves last.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
}

impl HistoryStore {
    /// Create a store at the default location
    /// (`~/.local/share/linesift/history.json` on Linux).
    pub fn new() -> Self {
        Self::with_path(Self::default_path())
    }

    /// Create a store backed by a custom file (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Get the default history file path.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("linesift")
            .join(HISTORY_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Load the persisted history, most recent first.
    ///
    /// Never fails: a missing or unreadable file, or one that is not a JSON
    /// array, yields an empty list. Malformed entries are dropped.
    pub fn load(&self) -> HistoryList {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot read history file");
                return Vec::new();
            }
        };

        match parse_history(&content) {
            Ok(parsed) => {
                debug!(
                    path = %self.path.display(),
                    entries = parsed.entries.len(),
                    skipped = parsed.skipped.len(),
                    "History loaded"
                );
                parsed.entries
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "History file is malformed, ignoring it");
                Vec::new()
            }
        }
    }

    /// Overwrite the history file with `list`.
    pub fn save(&self, list: &[HistoryEntry]) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(list)?;
        self.write(&json)?;
        debug!(path = %self.path.display(), entries = list.len(), "History saved");
        Ok(())
    }

    /// Load, append `entry` (promoting a duplicate), cap the length and save.
    pub fn record(&self, entry: HistoryEntry) -> Recorded {
        let history = truncate(append(self.load(), entry), self.max_entries);
        let warning = self.save(&history).err();
        if let Some(ref e) = warning {
            warn!(error = %e, "Failed to persist filter history");
        }
        Recorded { history, warning }
    }

    /// Persist an empty history.
    pub fn clear(&self) -> Result<(), HistoryError> {
        self.save(&[])
    }

    /// History serialized for hand editing.
    pub fn to_raw(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string_pretty(&self.load())?)
    }

    /// Validate and save hand-edited history text.
    ///
    /// Any malformed entry rejects the whole save and leaves the file
    /// untouched.
    pub fn save_raw(&self, text: &str) -> Result<HistoryList, HistoryError> {
        let list = parse_history_strict(text)?;
        self.save(&list)?;
        Ok(list)
    }

    fn write(&self, json: &str) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    HistoryError::Persistence {
                        action: "create directory for",
                        path: self.path.clone(),
                        source,
                    }
                })?;
            }
        }

        // Write a sibling temp file then rename over the old one.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes()).map_err(|source| HistoryError::Persistence {
            action: "write",
            path: tmp.clone(),
            source,
        })?;

        std::fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            HistoryError::Persistence {
                action: "replace",
                path: self.path.clone(),
                source,
            }
        })
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
