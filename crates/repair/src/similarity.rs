use mend_store::CodeFragment;
use std::collections::BTreeSet;

/// Minimum similarity score a donor candidate must exceed (strictly) to be
/// accepted as repair output.
pub const ACCEPT_THRESHOLD: f32 = 0.70;

/// Jaccard index over the distinct character sets of two fingerprints.
///
/// Intentionally coarse and cheap: it tolerates renames and small arity
/// shifts but can alias distinct fingerprints. Two empty fingerprints are
/// identical shapes and score 1.0; empty against non-empty scores 0.0.
pub fn jaccard(a: &str, b: &str) -> f32 {
    let left: BTreeSet<char> = a.chars().collect();
    let right: BTreeSet<char> = b.chars().collect();

    if left.is_empty() && right.is_empty() {
        return 1.0;
    }

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f32 / union as f32
}

/// A candidate fragment scored against a query fingerprint.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub fragment: CodeFragment,
    pub score: f32,
}

/// Score candidates against a query fingerprint and rank them descending.
/// The sort is stable, so ties keep store order (oldest first).
pub fn rank_candidates(query: &str, candidates: Vec<CodeFragment>) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|fragment| {
            let score = jaccard(query, &fragment.fingerprint);
            RankedCandidate { fragment, score }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// Top-ranked candidate, accepted only when its score strictly exceeds the
/// threshold.
pub fn best_match(
    query: &str,
    candidates: Vec<CodeFragment>,
    threshold: f32,
) -> Option<RankedCandidate> {
    rank_candidates(query, candidates)
        .into_iter()
        .next()
        .filter(|candidate| candidate.score > threshold)
}
