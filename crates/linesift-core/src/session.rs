use serde::Serialize;
use uuid::Uuid;

use crate::source::SourceId;

/// Identity of one open filter result.
///
/// Returned by every filter application and handed back to
/// [`Filterer::reapply`](crate::Filterer::reapply) to re-run new terms
/// against the same source. Sessions are plain values, so any number can be
/// open at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSession {
    id: Uuid,
    source: SourceId,
    filters: Vec<String>,
}

impl FilterSession {
    pub fn new(source: SourceId, filters: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            filters,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// The raw terms exactly as the user supplied them.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }
}
