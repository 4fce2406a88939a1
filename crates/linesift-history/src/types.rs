use serde::{Deserialize, Serialize};

/// Timestamp format used for new history entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One previously applied filter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub filters: Vec<String>,
}

/// Ordered history, most recent first.
pub type HistoryList = Vec<HistoryEntry>;

impl HistoryEntry {
    pub fn new(timestamp: impl Into<String>, filters: Vec<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            filters,
        }
    }

    /// Filters joined for single-line display.
    pub fn summary(&self) -> String {
        if self.filters.is_empty() {
            "(no filters)".to_string()
        } else {
            self.filters.join(", ")
        }
    }
}

/// Insert `entry` at the front, dropping any existing entry with the same
/// filter list. Filter equality is order-sensitive.
pub fn append(mut list: HistoryList, entry: HistoryEntry) -> HistoryList {
    list.retain(|existing| existing.filters != entry.filters);
    list.insert(0, entry);
    list
}

/// Keep at most `max` entries, discarding the oldest.
pub fn truncate(mut list: HistoryList, max: usize) -> HistoryList {
    list.truncate(max);
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: &str, filters: &[&str]) -> HistoryEntry {
        HistoryEntry::new(ts, filters.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_append_prepends() {
        let list = append(Vec::new(), entry("t1", &["a"]));
        let list = append(list, entry("t2", &["b"]));
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].filters, vec!["b"]);
        assert_eq!(list[1].filters, vec!["a"]);
    }

    #[test]
    fn test_append_promotes_duplicate() {
        let list = append(Vec::new(), entry("t1", &["a", "b"]));
        let list = append(list, entry("t2", &["c"]));
        let list = append(list, entry("t3", &["a", "b"]));

        assert_eq!(list.len(), 2);
        assert_eq!(list[0], entry("t3", &["a", "b"]));
        assert_eq!(list[1].filters, vec!["c"]);
    }

    #[test]
    fn test_append_is_order_sensitive() {
        let list = append(Vec::new(), entry("t1", &["a", "b"]));
        let list = append(list, entry("t2", &["b", "a"]));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_truncate_drops_oldest() {
        let list = vec![entry("t3", &["c"]), entry("t2", &["b"]), entry("t1", &["a"])];
        let list = truncate(list, 2);
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].filters, vec!["b"]);
    }

    #[test]
    fn test_summary() {
        assert_eq!(entry("t", &["a", "!b"]).summary(), "a, !b");
        assert_eq!(entry("t", &[]).summary(), "(no filters)");
    }
}
