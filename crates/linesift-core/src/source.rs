//! Collaborators the filter session reads from and writes to.

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use linesift_history::TIMESTAMP_FORMAT;
use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Opaque identity of a text source, e.g. a file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for SourceId {
    fn from(path: &Path) -> Self {
        Self(path.display().to_string())
    }
}

/// Something that can produce every line of a source.
pub trait LineSource {
    fn read_all_lines(&self, source: &SourceId) -> Result<Vec<String>, FilterError>;
}

/// Something that displays a sequence of lines, replacing what it showed before.
pub trait LineTarget {
    fn replace_lines(&mut self, lines: &[String]) -> Result<(), FilterError>;
}

/// Supplies timestamps for history entries.
pub trait Clock {
    fn now(&self) -> String;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// A clock that always returns the same timestamp (useful for testing).
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}

/// Reads sources as file paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl LineSource for FileSource {
    fn read_all_lines(&self, source: &SourceId) -> Result<Vec<String>, FilterError> {
        let file = std::fs::File::open(source.as_str()).map_err(|error| FilterError::Source {
            source_id: source.clone(),
            error,
        })?;
        read_lines(BufReader::new(file)).map_err(|error| FilterError::Source {
            source_id: source.clone(),
            error,
        })
    }
}

/// Sources held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sources: HashMap<SourceId, Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SourceId, lines: Vec<String>) {
        self.sources.insert(id, lines);
    }

    pub fn with_source(mut self, id: SourceId, lines: Vec<String>) -> Self {
        self.insert(id, lines);
        self
    }
}

impl LineSource for MemorySource {
    fn read_all_lines(&self, source: &SourceId) -> Result<Vec<String>, FilterError> {
        self.sources
            .get(source)
            .cloned()
            .ok_or_else(|| FilterError::UnknownSource(source.clone()))
    }
}

/// Read every line, replacing invalid UTF-8 rather than failing.
pub fn read_lines<R: BufRead>(mut reader: R) -> std::io::Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(lines)
}

/// Writes lines to any `io::Write`, one per line.
pub struct WriterTarget<W: Write> {
    writer: W,
}

impl<W: Write> WriterTarget<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LineTarget for WriterTarget<W> {
    fn replace_lines(&mut self, lines: &[String]) -> Result<(), FilterError> {
        for line in lines {
            writeln!(self.writer, "{}", line).map_err(FilterError::Target)?;
        }
        self.writer.flush().map_err(FilterError::Target)
    }
}

/// Rewrites a whole file with the result lines.
#[derive(Debug, Clone)]
pub struct FileTarget {
    path: PathBuf,
}

impl FileTarget {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineTarget for FileTarget {
    fn replace_lines(&mut self, lines: &[String]) -> Result<(), FilterError> {
        let mut content = lines.join("\n");
        if !lines.is_empty() {
            content.push('\n');
        }
        std::fs::write(&self.path, content).map_err(FilterError::Target)
    }
}

impl LineTarget for Vec<String> {
    fn replace_lines(&mut self, lines: &[String]) -> Result<(), FilterError> {
        self.clear();
        self.extend_from_slice(lines);
        Ok(())
    }
}
