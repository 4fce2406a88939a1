//! Where `filter` reads its lines from.

use anyhow::{Context, Result};

use linesift_core::{
    read_lines, FileSource, FilterError, LineSource, MemorySource, SourceId,
};

/// Source argument meaning standard input.
pub const STDIN_SOURCE: &str = "-";

/// A file, re-read on every application, or standard input buffered once so
/// it can be filtered again.
#[derive(Debug)]
pub enum Input {
    File(FileSource),
    Buffered(MemorySource),
}

impl Input {
    /// Resolve a source argument.
    pub fn open(source: &str) -> Result<(Self, SourceId)> {
        let id = SourceId::new(source);
        if source != STDIN_SOURCE {
            return Ok((Input::File(FileSource), id));
        }

        let lines = read_lines(std::io::stdin().lock()).context("Failed to read stdin")?;
        Ok((Input::buffered(id.clone(), lines), id))
    }

    pub fn buffered(id: SourceId, lines: Vec<String>) -> Self {
        Input::Buffered(MemorySource::new().with_source(id, lines))
    }
}

impl LineSource for Input {
    fn read_all_lines(&self, source: &SourceId) -> Result<Vec<String>, FilterError> {
        match self {
            Input::File(files) => files.read_all_lines(source),
            Input::Buffered(memory) => memory.read_all_lines(source),
        }
    }
}
