//! Integration tests: run the linesift binary against temporary files.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const LINESIFT_BIN: &str = env!("CARGO_BIN_EXE_linesift");

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn history_file(&self) -> PathBuf {
        self.path().join("history.json")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn linesift(&self, args: &[&str]) -> Output {
        Command::new(LINESIFT_BIN)
            .arg("--history-file")
            .arg(self.history_file())
            .arg("--log-format")
            .arg("compact")
            .args(args)
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }

    fn history_json(&self) -> serde_json::Value {
        let out = self.linesift(&["history", "list", "--json"]);
        assert!(out.status.success());
        serde_json::from_slice(&out.stdout).unwrap()
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

const LOG: &str = "\
2024-05-01 INFO server started
2024-05-01 ERROR connection reset
2024-05-01 DEBUG retry scheduled
2024-05-01 ERROR retry failed
2024-05-01 WARN disk 91% full
";

#[test]
fn test_filter_prints_matching_lines() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);

    let out = ws.linesift(&["filter", "app.log", "error", "!retry"]);

    assert_eq!(out.status.code(), Some(0));
    assert_eq!(stdout(&out), "2024-05-01 ERROR connection reset\n");
}

#[test]
fn test_filter_without_matches_exits_one() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);

    let out = ws.linesift(&["filter", "app.log", "panic"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).is_empty());
    // Zero-match runs are remembered too
    assert_eq!(ws.history_json()[0]["filters"][0], "panic");
}

#[test]
fn test_filter_missing_source_fails() {
    let ws = Workspace::new();
    let out = ws.linesift(&["filter", "nope.log", "x"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope.log"));
}

#[test]
fn test_filter_to_output_file() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);
    let target = ws.path().join("errors.txt");

    let out = ws.linesift(&[
        "filter",
        "app.log",
        "ERROR",
        "--output",
        target.to_str().unwrap(),
    ]);

    assert!(out.status.success());
    assert!(stdout(&out).is_empty());
    assert_eq!(
        std::fs::read_to_string(target).unwrap(),
        "2024-05-01 ERROR connection reset\n2024-05-01 ERROR retry failed\n"
    );
}

#[test]
fn test_history_dedups_and_promotes() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);

    ws.linesift(&["filter", "app.log", "error"]);
    ws.linesift(&["filter", "app.log", "warn"]);
    ws.linesift(&["filter", "app.log", "error"]);

    let history = ws.history_json();
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["filters"], serde_json::json!(["error"]));
    assert_eq!(entries[1]["filters"], serde_json::json!(["warn"]));
}

#[test]
fn test_history_show_and_rerun() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);
    ws.write("other.log", "warn: low memory\ninfo: ok\n");

    ws.linesift(&["filter", "app.log", "warn"]);
    ws.linesift(&["filter", "app.log", "info"]);

    let out = ws.linesift(&["history", "show", "2", "--json"]);
    assert!(out.status.success());
    let entry: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(entry["filters"], serde_json::json!(["warn"]));

    let out = ws.linesift(&["history", "rerun", "other.log", "--entry", "2"]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(stdout(&out), "warn: low memory\n");

    // Rerunning promotes the entry
    assert_eq!(ws.history_json()[0]["filters"], serde_json::json!(["warn"]));
}

#[test]
fn test_history_show_out_of_range() {
    let ws = Workspace::new();
    let out = ws.linesift(&["history", "show", "3"]);
    assert!(!out.status.success());
}

#[test]
fn test_history_clear() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);
    ws.linesift(&["filter", "app.log", "error"]);

    let out = ws.linesift(&["history", "clear"]);
    assert!(out.status.success());
    assert_eq!(ws.history_json(), serde_json::json!([]));
}

#[test]
fn test_malformed_history_file_is_ignored() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);
    ws.write("history.json", "not json");

    let out = ws.linesift(&["filter", "app.log", "warn"]);
    assert!(out.status.success());

    let history = ws.history_json();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[test]
fn test_config_file_sets_max_history() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);
    ws.write("linesift.toml", "max_history = 2\n");

    for term in ["a", "b", "c"] {
        ws.linesift(&["filter", "app.log", term]);
    }

    let history = ws.history_json();
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["filters"], serde_json::json!(["c"]));
}

#[test]
fn test_bad_config_file_is_an_error() {
    let ws = Workspace::new();
    ws.write("app.log", LOG);
    ws.write("linesift.toml", "unknown_key = 1\n");

    let out = ws.linesift(&["filter", "app.log", "x"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("linesift.toml"));
}

#[cfg(unix)]
#[test]
fn test_run_filters_command_output() {
    let ws = Workspace::new();

    let out = ws.linesift(&[
        "run",
        "-t",
        "keep",
        "--",
        "sh",
        "-c",
        "echo keep one; echo drop two; echo keep three",
    ]);

    assert_eq!(out.status.code(), Some(0));
    assert_eq!(stdout(&out), "keep one\nkeep three\n");
    assert_eq!(ws.history_json()[0]["filters"], serde_json::json!(["keep"]));
}

#[cfg(unix)]
#[test]
fn test_run_propagates_exit_code() {
    let ws = Workspace::new();
    let out = ws.linesift(&["run", "--", "sh", "-c", "exit 7"]);
    assert_eq!(out.status.code(), Some(7));
}

#[test]
fn test_run_missing_program_fails() {
    let ws = Workspace::new();
    let out = ws.linesift(&["run", "--", "linesift-no-such-program"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("linesift-no-such-program"));
}
