//! Fuzzy name matching for item lookup.
//!
//! Lookup thresholds use a 0-100 scale where 100 requires an exact match,
//! backed by normalized Levenshtein similarity.

/// Similarity between two names on the 0-100 threshold scale.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best-scoring candidate for `query`, accepted only at or above
/// `threshold`.
///
/// Candidates are scanned in order and only a strictly better score
/// replaces the current best, so ties resolve to the earliest candidate and
/// selection is deterministic.
pub fn best_match<'a, I>(query: &str, candidates: I, threshold: u8) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = similarity(query, candidate);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    best.filter(|&(_, score)| score >= f64::from(threshold))
        .map(|(candidate, _)| candidate)
}
