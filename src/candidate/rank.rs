//! Deterministic score ranking for suppression.

use std::cmp::Ordering;

fn rank_cmp(scores: &[f32], a: u32, b: u32) -> Ordering {
    scores[b as usize]
        .total_cmp(&scores[a as usize])
        .then_with(|| a.cmp(&b))
}

/// Fills `ranks` with a permutation of candidate indices sorted by score
/// descending.
///
/// Ties are broken by original index ascending, so the ordering is total and
/// the downstream keep/discard decisions are deterministic regardless of how
/// the sort is implemented.
pub fn rank_by_score(scores: &[f32], ranks: &mut [u32]) {
    debug_assert_eq!(scores.len(), ranks.len());
    for (i, slot) in ranks.iter_mut().enumerate() {
        *slot = i as u32;
    }
    ranks.sort_unstable_by(|&a, &b| rank_cmp(scores, a, b));
}
