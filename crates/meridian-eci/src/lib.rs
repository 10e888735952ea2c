//! Expertise Contribution Index (ECI).
//!
//! The discipline-scoped weight of a review, derived from the expertise the
//! reviewer spent and the votes the review attracted relative to its sibling
//! reviews on the same content. The value is recomputed from scratch on
//! every query: votes and reviews can still arrive after the fact and must
//! immediately affect the weight, so callers must not assume monotonicity
//! between calls and must not cache the result.
//!
//! For a review `r` in discipline `d`:
//!
//! ```text
//! Cr = Cea * (Er / Er_avg) + Cva * (1 - 1/n) * (Vr / Vi)
//! weight(r, d) = round(sign(r) * Cr * Er)
//! ```
//!
//! where `Er` is the expertise `r`'s author spent in `d`, `Er_avg` the
//! average spent across the content's sibling reviews carrying `d`, `n` the
//! sibling count, `Vr` the vote weight received by `r` in `d` and `Vi` the
//! total vote weight across all siblings in `d` (substituting 1 when zero).

#![deny(unsafe_code)]

use meridian_types::config::{ECI_CURATOR_INFLUENCE, ECI_REVIEWER_INFLUENCE};
use meridian_types::{DisciplineId, ReviewId, Share};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One sibling review's contribution sample in a single discipline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSample {
    pub review_id: ReviewId,
    /// Expertise the author spent in the discipline (`Er`).
    pub expertise_spent: Share,
    /// Total vote weight this review received in the discipline (`Vr`).
    pub votes_received: Share,
    /// Positive or negative judgment.
    pub is_positive: bool,
}

/// Signed ECI weight of one review in one discipline, given all sibling
/// reviews on the same content that carry that discipline.
///
/// Returns `None` when `subject` is not among the samples or spent no
/// expertise in the discipline.
pub fn review_weight(subject: ReviewId, samples: &[ReviewSample]) -> Option<i64> {
    let review = samples.iter().find(|s| s.review_id == subject)?;
    if review.expertise_spent <= 0 {
        return None;
    }

    let n = samples.len() as f64;
    let total_spent: Share = samples.iter().map(|s| s.expertise_spent).sum();
    let avg_spent = total_spent as f64 / n;

    let total_votes: Share = samples.iter().map(|s| s.votes_received).sum();
    // divide-by-zero guard: an electorate that cast nothing counts as 1
    let vi = if total_votes == 0 { 1.0 } else { total_votes as f64 };

    let er = review.expertise_spent as f64;
    let vr = review.votes_received as f64;

    let cr = ECI_REVIEWER_INFLUENCE * (er / avg_spent)
        + ECI_CURATOR_INFLUENCE * (1.0 - 1.0 / n) * (vr / vi);

    let sign = if review.is_positive { 1.0 } else { -1.0 };
    Some((sign * cr * er).round() as i64)
}

/// ECI weights of one review across all its disciplines.
///
/// `samples_by_discipline` must contain, per discipline, every sibling
/// review on the same content that spent expertise in that discipline.
pub fn review_weights_by_discipline(
    subject: ReviewId,
    samples_by_discipline: &BTreeMap<DisciplineId, Vec<ReviewSample>>,
) -> BTreeMap<DisciplineId, i64> {
    let mut weights = BTreeMap::new();
    for (discipline, samples) in samples_by_discipline {
        if let Some(weight) = review_weight(subject, samples) {
            weights.insert(*discipline, weight);
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: u64, spent: Share, votes: Share, positive: bool) -> ReviewSample {
        ReviewSample {
            review_id: ReviewId(id),
            expertise_spent: spent,
            votes_received: votes,
            is_positive: positive,
        }
    }

    #[test]
    fn lone_review_weight_equals_spent_expertise() {
        // n = 1: the vote term vanishes, Er/Er_avg = 1, so weight = Er.
        let samples = vec![sample(0, 500, 0, true)];
        assert_eq!(review_weight(ReviewId(0), &samples), Some(500));
    }

    #[test]
    fn negative_review_flips_the_sign() {
        let samples = vec![sample(0, 500, 0, false)];
        assert_eq!(review_weight(ReviewId(0), &samples), Some(-500));
    }

    #[test]
    fn above_average_expertise_outweighs_siblings() {
        let samples = vec![sample(0, 900, 0, true), sample(1, 100, 0, true)];
        // Er_avg = 500; review 0: Cr = 900/500 = 1.8 -> 1620
        assert_eq!(review_weight(ReviewId(0), &samples), Some(1620));
        // review 1: Cr = 100/500 = 0.2 -> 20
        assert_eq!(review_weight(ReviewId(1), &samples), Some(20));
    }

    #[test]
    fn votes_shift_weight_between_equally_expert_reviews() {
        let no_votes = vec![sample(0, 400, 0, true), sample(1, 400, 0, true)];
        let with_votes = vec![sample(0, 400, 300, true), sample(1, 400, 100, true)];

        let base = review_weight(ReviewId(0), &no_votes).unwrap();
        let boosted = review_weight(ReviewId(0), &with_votes).unwrap();
        assert!(boosted > base);

        // Cr = 1 + 1*(1 - 1/2)*(300/400) = 1.375 -> 550
        assert_eq!(boosted, 550);
    }

    #[test]
    fn zero_total_votes_substitutes_one_not_panic() {
        let samples = vec![sample(0, 10, 0, true), sample(1, 10, 0, true)];
        assert_eq!(review_weight(ReviewId(0), &samples), Some(10));
    }

    #[test]
    fn unknown_subject_yields_none() {
        let samples = vec![sample(0, 10, 0, true)];
        assert_eq!(review_weight(ReviewId(9), &samples), None);
    }

    #[test]
    fn recompute_reflects_late_votes() {
        // same subject, fresh query after a late vote arrives: result moves
        let before = vec![sample(0, 400, 0, true), sample(1, 400, 0, true)];
        let after = vec![sample(0, 400, 50, true), sample(1, 400, 0, true)];
        let w_before = review_weight(ReviewId(0), &before).unwrap();
        let w_after = review_weight(ReviewId(0), &after).unwrap();
        assert_ne!(w_before, w_after);
    }
}
