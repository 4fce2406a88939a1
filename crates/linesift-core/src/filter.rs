//! Literal substring filter engine.
//!
//! A filter spec is a list of terms. Lines must contain at least one positive
//! term (when any exist) and none of the negative (`!`-prefixed) terms.
//! Matching is case-insensitive and purely literal: characters such as `.`,
//! `*` or `[` have no special meaning.

/// Prefix marking a term as negative.
pub const NEGATION_PREFIX: char = '!';

/// A single parsed filter term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTerm {
    text: String,
    folded: String,
    negated: bool,
}

impl FilterTerm {
    fn new(text: &str, negated: bool) -> Self {
        Self {
            text: text.to_string(),
            folded: text.to_lowercase(),
            negated,
        }
    }

    /// The literal text searched for, without the negation prefix.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// The term in its raw, user-facing form.
    pub fn to_raw(&self) -> String {
        if self.negated {
            format!("{}{}", NEGATION_PREFIX, self.text)
        } else {
            self.text.clone()
        }
    }

    fn found_in(&self, folded_line: &str) -> bool {
        folded_line.contains(&self.folded)
    }
}

/// Parsed include/exclude filter set. Term order is kept as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    terms: Vec<FilterTerm>,
}

impl FilterSpec {
    /// Parse raw terms. Blank terms, and a bare `!`, are dropped.
    pub fn parse<I, S>(raw_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = raw_terms
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref();
                if raw.trim().is_empty() {
                    return None;
                }
                match raw.strip_prefix(NEGATION_PREFIX) {
                    Some(body) if body.trim().is_empty() => None,
                    Some(body) => Some(FilterTerm::new(body, true)),
                    None => Some(FilterTerm::new(raw, false)),
                }
            })
            .collect();
        Self { terms }
    }

    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    pub fn positives(&self) -> impl Iterator<Item = &FilterTerm> {
        self.terms.iter().filter(|t| !t.negated)
    }

    pub fn negatives(&self) -> impl Iterator<Item = &FilterTerm> {
        self.terms.iter().filter(|t| t.negated)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in raw string form, as stored in history.
    pub fn to_raw(&self) -> Vec<String> {
        self.terms.iter().map(FilterTerm::to_raw).collect()
    }

    /// Check whether a single line passes the filter.
    pub fn matches(&self, line: &str) -> bool {
        if self.terms.is_empty() {
            return true;
        }

        let folded = line.to_lowercase();

        if self.negatives().any(|t| t.found_in(&folded)) {
            return false;
        }

        let mut positives = self.positives().peekable();
        positives.peek().is_none() || positives.any(|t| t.found_in(&folded))
    }

    /// Matching lines in their original order. Duplicates are kept.
    pub fn apply<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
        lines
            .iter()
            .map(AsRef::as_ref)
            .filter(|line| self.matches(line))
            .map(str::to_string)
            .collect()
    }
}

/// Parse raw terms into a [`FilterSpec`].
pub fn parse<I, S>(raw_terms: I) -> FilterSpec
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    FilterSpec::parse(raw_terms)
}

/// Check a single line against `spec`.
pub fn matches(line: &str, spec: &FilterSpec) -> bool {
    spec.matches(line)
}

/// Apply `spec` to `lines`, keeping order.
pub fn apply<S: AsRef<str>>(lines: &[S], spec: &FilterSpec) -> Vec<String> {
    spec.apply(lines)
}
