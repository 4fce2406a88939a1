use linesift_history::{HistoryEntry, HistoryError, HistoryStore};
use tracing::{debug, info};

use crate::error::FilterError;
use crate::filter::FilterSpec;
use crate::outcome::FilterOutcome;
use crate::session::FilterSession;
use crate::source::{Clock, LineSource, LineTarget, SourceId, SystemClock};

/// Runs filter applications against a line source and records them in
/// history.
pub struct Filterer<S, C = SystemClock> {
    source: S,
    history: HistoryStore,
    clock: C,
}

impl<S: LineSource> Filterer<S> {
    pub fn new(source: S, history: HistoryStore) -> Self {
        Self::with_clock(source, history, SystemClock)
    }
}

impl<S: LineSource, C: Clock> Filterer<S, C> {
    pub fn with_clock(source: S, history: HistoryStore, clock: C) -> Self {
        Self {
            source,
            history,
            clock,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Read `source_id`, filter it with `raw_terms` and record the terms.
    pub fn start(
        &self,
        source_id: SourceId,
        raw_terms: &[String],
    ) -> Result<FilterOutcome, FilterError> {
        let lines = self.source.read_all_lines(&source_id)?;
        Ok(self.start_with_lines(source_id, &lines, raw_terms))
    }

    /// Filter lines the caller already has.
    pub fn start_with_lines(
        &self,
        source_id: SourceId,
        lines: &[String],
        raw_terms: &[String],
    ) -> FilterOutcome {
        let spec = FilterSpec::parse(raw_terms);
        let result = spec.apply(lines);

        info!(
            source = %source_id,
            terms = spec.terms().len(),
            matched = result.len(),
            total = lines.len(),
            "Applied filters"
        );

        let history_warning = self.record(&spec);

        FilterOutcome {
            lines: result,
            total_lines: lines.len(),
            session: FilterSession::new(source_id, raw_terms.to_vec()),
            history_warning,
        }
    }

    /// Re-run new terms against the source of an existing session.
    pub fn reapply(
        &self,
        session: &FilterSession,
        raw_terms: &[String],
    ) -> Result<FilterOutcome, FilterError> {
        debug!(session = %session.id(), source = %session.source(), "Reapplying filters");
        self.start(session.source().clone(), raw_terms)
    }

    /// Filter a source and show the result on `target`.
    pub fn apply_to<T: LineTarget + ?Sized>(
        &self,
        target: &mut T,
        source_id: SourceId,
        raw_terms: &[String],
    ) -> Result<FilterOutcome, FilterError> {
        let outcome = self.start(source_id, raw_terms)?;
        target.replace_lines(&outcome.lines)?;
        Ok(outcome)
    }

    /// Reapply new terms and show the result on `target`.
    pub fn rerun_to<T: LineTarget + ?Sized>(
        &self,
        target: &mut T,
        session: &FilterSession,
        raw_terms: &[String],
    ) -> Result<FilterOutcome, FilterError> {
        let outcome = self.reapply(session, raw_terms)?;
        target.replace_lines(&outcome.lines)?;
        Ok(outcome)
    }

    /// Record an applied spec. Every application is recorded, including
    /// ones with no matching lines.
    fn record(&self, spec: &FilterSpec) -> Option<HistoryError> {
        let entry = HistoryEntry::new(self.clock.now(), spec.to_raw());
        self.history.record(entry).warning
    }
}
