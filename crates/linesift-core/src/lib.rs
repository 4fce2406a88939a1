//! # linesift-core
//!
//! Narrow text down to the lines matching a set of literal filters.
//!
//! - [`FilterSpec`] parses raw terms (`!term` excludes) and matches lines.
//! - [`Filterer`] reads a [`LineSource`], applies a spec, records the terms in
//!   history and returns a [`FilterOutcome`] carrying a [`FilterSession`] that
//!   can be re-run with edited terms.

mod error;
pub mod filter;
mod filterer;
mod outcome;
mod session;
pub mod source;

pub use error::FilterError;
pub use filter::{FilterSpec, FilterTerm, NEGATION_PREFIX};
pub use filterer::Filterer;
pub use outcome::FilterOutcome;
pub use session::FilterSession;
pub use source::{
    read_lines, Clock, FileSource, FileTarget, FixedClock, LineSource, LineTarget, MemorySource,
    SourceId, SystemClock, WriterTarget,
};
