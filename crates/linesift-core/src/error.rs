use thiserror::Error;

use crate::source::SourceId;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Failed to read source {source_id}: {error}")]
    Source {
        source_id: SourceId,
        #[source]
        error: std::io::Error,
    },

    #[error("Unknown source: {0}")]
    UnknownSource(SourceId),

    #[error("Failed to write filtered lines: {0}")]
    Target(#[source] std::io::Error),
}
