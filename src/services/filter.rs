use regex::{Regex, RegexBuilder};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::models::{Process, StatusFilter};

/// Search/status filter with a session-wide cache of compiled search terms.
///
/// The cache is keyed by the exact term text and also remembers terms that
/// failed to compile, so an invalid pattern is parsed once and then skipped.
#[derive(Default)]
pub struct FilterEngine {
    patterns: Mutex<HashMap<String, Option<Regex>>>,
}

/// One OR-term, prepared once per `filter` call
struct SearchTerm<'t> {
    raw: &'t str,
    needle: String,
    regex: OnceCell<Option<Regex>>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order-preserving subsequence of `processes` matching both the search
    /// expression and the status filter.
    pub fn filter<'a, I>(&self, processes: I, search_term: &str, status: &StatusFilter) -> Vec<&'a Process>
    where
        I: IntoIterator<Item = &'a Process>,
    {
        let terms: Vec<SearchTerm<'_>> = split_terms(search_term)
            .into_iter()
            .map(|raw| SearchTerm {
                raw,
                needle: raw.to_lowercase(),
                regex: OnceCell::new(),
            })
            .collect();

        processes
            .into_iter()
            .filter(|p| status.matches(p))
            .filter(|p| terms.is_empty() || self.any_term_matches(p, &terms))
            .collect()
    }

    fn any_term_matches(&self, process: &Process, terms: &[SearchTerm<'_>]) -> bool {
        let name = process.name.to_lowercase();
        let command = process.command.to_lowercase();
        let pid = process.pid.to_string();

        terms.iter().any(|term| {
            name.contains(&term.needle)
                || command.contains(&term.needle)
                || pid.contains(term.raw)
                || term
                    .regex
                    .get_or_init(|| self.compiled(term.raw))
                    .as_ref()
                    .is_some_and(|re| re.is_match(&process.name))
        })
    }

    /// Cached compile of `term`; only reached once the plain checks failed
    fn compiled(&self, term: &str) -> Option<Regex> {
        let mut patterns = self.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        patterns
            .entry(term.to_string())
            .or_insert_with(|| {
                RegexBuilder::new(term)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| log::debug!("Ignoring invalid search pattern '{}': {}", term, e))
                    .ok()
            })
            .clone()
    }

    #[cfg(test)]
    fn cached_patterns(&self) -> usize {
        self.patterns.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Comma-separated OR terms, trimmed. A blank expression yields no terms.
fn split_terms(search_term: &str) -> Vec<&str> {
    if search_term.trim().is_empty() {
        return Vec::new();
    }
    search_term.split(',').map(str::trim).collect()
}
