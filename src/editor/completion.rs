//! Completion session state and candidate filtering
//!
//! A session lives from the trigger keystroke until commit or cancel. While
//! it is open, typed characters extend `candidate_prefix` and the candidate
//! list is re-filtered by case-insensitive prefix and re-ranked with nucleo.

use crate::types::{Candidate, EntityKind};
use nucleo::{Matcher, Utf32Str};
use std::cmp::Reverse;

/// Whether the editor is linking an entity right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Idle,
    Listening(EntityKind),
}

/// One entity-linking gesture, owned by a single editor
#[derive(Debug, Clone)]
pub struct CompletionSession {
    /// Kind being linked
    pub kind: EntityKind,
    /// Document position where typing for this link started
    pub anchor_start: usize,
    /// Text typed since the trigger
    pub candidate_prefix: String,
    /// Filtered, ranked candidates
    pub list: CandidateList,
}

impl CompletionSession {
    pub fn new(kind: EntityKind, anchor_start: usize) -> Self {
        Self {
            kind,
            anchor_start,
            candidate_prefix: String::new(),
            list: CandidateList::default(),
        }
    }
}

/// Candidates matching the typed prefix, with a highlighted entry
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    matches: Vec<Candidate>,
    selected: usize,
}

impl CandidateList {
    /// Keep candidates whose key starts with `prefix` (ignoring case), best
    /// nucleo score first, ties by key
    pub fn filter(
        matcher: &mut Matcher,
        prefix: &str,
        candidates: &[Candidate],
        limit: usize,
    ) -> Self {
        let needle = prefix.to_lowercase();
        let mut needle_buf = Vec::new();
        let mut haystack_buf = Vec::new();

        let mut scored: Vec<(u16, &Candidate)> = candidates
            .iter()
            .filter(|candidate| candidate.key.to_lowercase().starts_with(&needle))
            .map(|candidate| {
                let score = if prefix.is_empty() {
                    0
                } else {
                    matcher
                        .fuzzy_match(
                            Utf32Str::new(&candidate.key, &mut haystack_buf),
                            Utf32Str::new(prefix, &mut needle_buf),
                        )
                        .unwrap_or(0)
                };
                (score, candidate)
            })
            .collect();

        scored.sort_by(|(a_score, a), (b_score, b)| {
            Reverse(*a_score)
                .cmp(&Reverse(*b_score))
                .then_with(|| a.key.cmp(&b.key))
        });
        scored.truncate(limit);

        Self {
            matches: scored.into_iter().map(|(_, candidate)| candidate.clone()).collect(),
            selected: 0,
        }
    }

    pub fn matches(&self) -> &[Candidate] {
        &self.matches
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Highlighted candidate
    pub fn selected(&self) -> Option<&Candidate> {
        self.matches.get(self.selected)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Move selection up, wrapping to the last entry
    pub fn select_previous(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.selected = if self.selected > 0 {
            self.selected - 1
        } else {
            self.matches.len() - 1
        };
    }

    /// Move selection down, wrapping to the first entry
    pub fn select_next(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.matches.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn references() -> Vec<Candidate> {
        vec![
            Candidate::new("smith2020", "Smith et al. (2020)", "r-1"),
            Candidate::new("Smith2019", "Smith (2019)", "r-2"),
            Candidate::new("jones2021", "Jones (2021)", "r-3"),
        ]
    }

    #[test]
    fn test_prefix_filter_ignores_case() {
        let mut matcher = Matcher::new(nucleo::Config::DEFAULT);
        let list = CandidateList::filter(&mut matcher, "SMI", &references(), 10);
        let keys: Vec<_> = list.matches().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"smith2020"));
        assert!(keys.contains(&"Smith2019"));
    }

    #[test]
    fn test_empty_prefix_lists_everything_by_key() {
        let mut matcher = Matcher::new(nucleo::Config::DEFAULT);
        let list = CandidateList::filter(&mut matcher, "", &references(), 10);
        let keys: Vec<_> = list.matches().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["Smith2019", "jones2021", "smith2020"]);
    }

    #[test]
    fn test_limit_truncates() {
        let mut matcher = Matcher::new(nucleo::Config::DEFAULT);
        let list = CandidateList::filter(&mut matcher, "", &references(), 1);
        assert_eq!(list.matches().len(), 1);
    }

    #[test]
    fn test_selection_wraps() {
        let mut matcher = Matcher::new(nucleo::Config::DEFAULT);
        let mut list = CandidateList::filter(&mut matcher, "", &references(), 10);
        list.select_previous();
        assert_eq!(list.selected_index(), 2);
        list.select_next();
        assert_eq!(list.selected_index(), 0);
    }

    #[test]
    fn test_no_match_is_empty() {
        let mut matcher = Matcher::new(nucleo::Config::DEFAULT);
        let mut list = CandidateList::filter(&mut matcher, "xyz", &references(), 10);
        assert!(list.is_empty());
        assert!(list.selected().is_none());
        list.select_next();
        assert!(list.selected().is_none());
    }
}
