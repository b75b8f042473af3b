//! Score-gap rebalancing for the daily engine.
//!
//! When a new candidate outscores the weakest holding by at least the
//! configured gap, the weakest holding is the one to force-exit with reason
//! `REBALANCE`. The intraday session loop does not call this.

use crate::domain::Suggestion;

/// Weakest holding to replace with `candidate`, if the gap is large enough.
///
/// Ties on score go to the later symbol so the choice is deterministic.
pub fn pick_replacement<'a>(
    held: &'a [Suggestion],
    candidate: &Suggestion,
    min_score_gap: f64,
) -> Option<&'a Suggestion> {
    if held.iter().any(|h| h.symbol == candidate.symbol) {
        return None;
    }
    let weakest = held
        .iter()
        .filter(|h| h.score.is_finite())
        .min_by(|a, b| a.score.total_cmp(&b.score).then_with(|| b.symbol.cmp(&a.symbol)))?;
    (candidate.score - weakest.score >= min_score_gap).then_some(weakest)
}
