//! Incremental autocomplete over a facet's candidates.

use crate::models::FacetValue;

/// Matches for one keystroke, in catalog order.
pub type MatchResult = Vec<FacetValue>;

/// Returns at most `max_results` candidates whose title or subtitle contains
/// `query`, ignoring case. A blank query browses the first `max_results`
/// candidates unfiltered.
pub fn match_candidates(query: &str, candidates: &[FacetValue], max_results: usize) -> MatchResult {
    if query.trim().is_empty() {
        return candidates.iter().take(max_results).cloned().collect();
    }

    let needle = query.to_lowercase();
    candidates
        .iter()
        .filter(|candidate| matches_needle(candidate, &needle))
        .take(max_results)
        .cloned()
        .collect()
}

/// `needle` must already be lowercase.
pub fn matches_needle(candidate: &FacetValue, needle: &str) -> bool {
    candidate.title.to_lowercase().contains(needle)
        || candidate
            .subtitle
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(needle))
}
