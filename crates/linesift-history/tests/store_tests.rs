use std::fs;

use linesift_history::{HistoryEntry, HistoryError, HistoryStore};
use tempfile::TempDir;

fn entry(ts: &str, filters: &[&str]) -> HistoryEntry {
    HistoryEntry::new(ts, filters.iter().map(|s| s.to_string()).collect())
}

/// Helper: a store pointing into a fresh temp directory.
fn temp_store() -> (TempDir, HistoryStore) {
    let dir = TempDir::new().unwrap();
    let store = HistoryStore::with_path(dir.path().join("history.json"));
    (dir, store)
}

// ============================================================
// Load tests
// ============================================================

#[test]
fn test_load_missing_file_is_empty() {
    let (_dir, store) = temp_store();
    assert!(store.load().is_empty());
}

#[test]
fn test_load_not_json_is_empty() {
    let (_dir, store) = temp_store();
    fs::write(store.path(), "not json").unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn test_load_skips_malformed_entries() {
    let (_dir, store) = temp_store();
    fs::write(
        store.path(),
        r#"[
            {"timestamp": "2026-01-21 10:00:00", "filters": ["timeout"]},
            {"timestamp": 12, "filters": ["bad"]},
            {"timestamp": "2026-01-20 10:00:00", "filters": ["error", "!retry"]}
        ]"#,
    )
    .unwrap();

    let history = store.load();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].filters, vec!["timeout"]);
    assert_eq!(history[1].filters, vec!["error", "!retry"]);
}

#[test]
fn test_load_directory_path_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = HistoryStore::with_path(dir.path().to_path_buf());
    assert!(store.load().is_empty());
}

// ============================================================
// Save / record tests
// ============================================================

#[test]
fn test_save_and_load_round_trip() {
    let (_dir, store) = temp_store();
    let list = vec![entry("t2", &["b"]), entry("t1", &["a", "!c"])];
    store.save(&list).unwrap();
    assert_eq!(store.load(), list);
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let store = HistoryStore::with_path(dir.path().join("nested").join("deep").join("h.json"));
    store.save(&[entry("t", &["x"])]).unwrap();
    assert_eq!(store.load().len(), 1);
}

#[test]
fn test_save_file_format() {
    let (_dir, store) = temp_store();
    store.save(&[entry("2026-01-20 10:00:00", &["a"])]).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        value,
        serde_json::json!([{"timestamp": "2026-01-20 10:00:00", "filters": ["a"]}])
    );
}

#[test]
fn test_record_twice_does_not_grow() {
    let (_dir, store) = temp_store();
    store.record(entry("2026-01-20 10:00:00", &["a", "b"]));
    let recorded = store.record(entry("2026-01-20 10:05:00", &["a", "b"]));

    assert!(recorded.warning.is_none());
    assert_eq!(recorded.history.len(), 1);
    assert_eq!(recorded.history[0].timestamp, "2026-01-20 10:05:00");
    assert_eq!(store.load(), recorded.history);
}

#[test]
fn test_record_promotes_reused_entry() {
    let (_dir, store) = temp_store();
    store.record(entry("t1", &["a"]));
    store.record(entry("t2", &["b"]));
    store.record(entry("t3", &["a"]));

    let history = store.load();
    let filters: Vec<&str> = history.iter().map(|e| e.filters[0].as_str()).collect();
    assert_eq!(filters, vec!["a", "b"]);
    assert_eq!(history[0].timestamp, "t3");
}

#[test]
fn test_record_respects_max_entries() {
    let dir = TempDir::new().unwrap();
    let store = HistoryStore::with_path(dir.path().join("history.json")).with_max_entries(2);
    store.record(entry("t1", &["a"]));
    store.record(entry("t2", &["b"]));
    store.record(entry("t3", &["c"]));

    let history = store.load();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].filters, vec!["c"]);
    assert_eq!(history[1].filters, vec!["b"]);
}

#[test]
fn test_record_over_malformed_file_recovers() {
    let (_dir, store) = temp_store();
    fs::write(store.path(), "not json").unwrap();

    let recorded = store.record(entry("t1", &["a"]));
    assert!(recorded.warning.is_none());
    assert_eq!(store.load().len(), 1);
}

#[test]
fn test_record_unwritable_path_warns() {
    let dir = TempDir::new().unwrap();
    // A regular file where the parent directory should be.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let store = HistoryStore::with_path(blocker.join("history.json"));

    let recorded = store.record(entry("t1", &["a"]));
    assert_eq!(recorded.history.len(), 1);
    assert!(matches!(
        recorded.warning,
        Some(HistoryError::Persistence { .. })
    ));
}

#[test]
fn test_clear() {
    let (_dir, store) = temp_store();
    store.record(entry("t1", &["a"]));
    store.clear().unwrap();
    assert!(store.load().is_empty());
    assert_eq!(fs::read_to_string(store.path()).unwrap().trim(), "[]");
}

// ============================================================
// Raw editing tests
// ============================================================

#[test]
fn test_save_raw_valid() {
    let (_dir, store) = temp_store();
    let saved = store
        .save_raw(r#"[{"timestamp": "t1", "filters": ["edited"]}]"#)
        .unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(store.load()[0].filters, vec!["edited"]);
}

#[test]
fn test_save_raw_malformed_entry_keeps_old_file() {
    let (_dir, store) = temp_store();
    store.record(entry("t1", &["original"]));

    let result = store.save_raw(
        r#"[{"timestamp": "t2", "filters": ["ok"]}, {"timestamp": "t3", "filters": "oops"}]"#,
    );
    assert!(matches!(result, Err(HistoryError::Parse { index: 1, .. })));
    assert_eq!(store.load()[0].filters, vec!["original"]);
}

#[test]
fn test_save_raw_not_json() {
    let (_dir, store) = temp_store();
    assert!(matches!(
        store.save_raw("not json"),
        Err(HistoryError::Malformed(_))
    ));
}

#[test]
fn test_to_raw_round_trips_through_save_raw() {
    let (_dir, store) = temp_store();
    store.record(entry("t1", &["a"]));
    store.record(entry("t2", &["b", "!c"]));

    let raw = store.to_raw().unwrap();
    let saved = store.save_raw(&raw).unwrap();
    assert_eq!(saved, store.load());
}
