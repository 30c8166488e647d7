//! Vote tallying.

use crate::types::{SeatId, VoteRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

/// Result of closing a voting phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    /// Votes received per seat.
    pub counts: BTreeMap<SeatId, usize>,
    /// Seat eliminated, `None` when nobody voted.
    pub eliminated: Option<SeatId>,
}

/// Picks the choice with the most occurrences. On a tie, the choice that
/// appeared first in `choices` wins.
pub fn leading_target(choices: impl IntoIterator<Item = SeatId>) -> Option<SeatId> {
    // (count, first position) per seat
    let mut tally: BTreeMap<SeatId, (usize, usize)> = BTreeMap::new();
    for (position, seat) in choices.into_iter().enumerate() {
        tally.entry(seat).or_insert((0, position)).0 += 1;
    }
    tally
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(seat, _)| seat)
}

/// Tallies a voting phase. Votes are ordered by their cast sequence first,
/// so the tie-break is the target whose first vote was cast earliest.
#[instrument(skip(votes), fields(votes = votes.len()))]
pub fn tally(votes: &[VoteRecord]) -> VoteOutcome {
    let mut ordered: Vec<&VoteRecord> = votes.iter().collect();
    ordered.sort_by_key(|v| v.sequence);

    let mut counts = BTreeMap::new();
    for vote in &ordered {
        *counts.entry(vote.target).or_insert(0) += 1;
    }

    VoteOutcome {
        counts,
        eliminated: leading_target(ordered.iter().map(|v| v.target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;
    use chrono::Utc;

    fn vote(voter: usize, target: usize, sequence: u64) -> VoteRecord {
        VoteRecord::new(SeatId(voter), SeatId(target), 1, Phase::Voting, sequence, Utc::now())
    }

    #[test]
    fn test_no_votes_no_elimination() {
        assert_eq!(tally(&[]).eliminated, None);
    }

    #[test]
    fn test_majority_wins() {
        let outcome = tally(&[vote(0, 3, 0), vote(1, 4, 1), vote(2, 4, 2)]);
        assert_eq!(outcome.eliminated, Some(SeatId(4)));
        assert_eq!(outcome.counts.get(&SeatId(4)), Some(&2));
    }

    #[test]
    fn test_tie_goes_to_earliest_cast() {
        let outcome = tally(&[vote(0, 5, 3), vote(1, 2, 1), vote(2, 5, 4), vote(3, 2, 2)]);
        assert_eq!(outcome.eliminated, Some(SeatId(2)));
    }

    #[test]
    fn test_tie_ignores_seat_index() {
        let outcome = tally(&[vote(0, 6, 0), vote(1, 1, 1)]);
        assert_eq!(outcome.eliminated, Some(SeatId(6)));
    }
}
