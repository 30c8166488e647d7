//! Vote ledger invariant: one vote per living seat, only while voting.

use super::Invariant;
use crate::types::{GameState, Phase};
use std::collections::BTreeSet;

/// Invariant: the open vote ledger is well formed.
///
/// Votes exist only during the voting phase and are stamped with it and
/// the current day. Every voter appears at most once, voters and targets
/// are alive, and nobody both voted and abstained.
pub struct VoteLedgerInvariant;

impl Invariant<GameState> for VoteLedgerInvariant {
    fn holds(state: &GameState) -> bool {
        if state.phase() != Phase::Voting {
            return state.votes().is_empty() && state.abstained().is_empty();
        }
        let mut voters = BTreeSet::new();
        state.votes().iter().all(|v| {
            voters.insert(v.voter)
                && v.phase == Phase::Voting
                && v.day == state.day()
                && state.is_alive(v.voter)
                && state.is_alive(v.target)
                && !state.abstained().contains(&v.voter)
        })
    }

    fn description() -> &'static str {
        "Each living seat votes at most once per voting phase"
    }
}
