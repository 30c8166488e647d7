//! Dead list invariant: every death is recorded once and the dead stay dead.

use super::Invariant;
use crate::types::GameState;
use std::collections::BTreeSet;

/// Invariant: the dead list matches the roster exactly.
///
/// Each dead seat appears once in the dead list and every seat in the list
/// is dead. Together with the transition check in the action contract this
/// makes the living set monotonically non-increasing.
pub struct DeadListConsistentInvariant;

impl Invariant<GameState> for DeadListConsistentInvariant {
    fn holds(state: &GameState) -> bool {
        let listed: BTreeSet<_> = state.dead().iter().map(|d| d.seat).collect();
        if listed.len() != state.dead().len() {
            return false;
        }
        let all_listed_dead = listed.iter().all(|seat| !state.is_alive(*seat));
        let dead_count = state.players().iter().filter(|p| !p.is_alive()).count();
        all_listed_dead && dead_count == listed.len()
    }

    fn description() -> &'static str {
        "Dead list records every dead seat exactly once"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GamePhaseEngine, MatchSettings, SeatId};

    #[test]
    fn test_fresh_table_holds() {
        let mut engine = GamePhaseEngine::new(MatchSettings::new(8).with_seed(3)).unwrap();
        engine.advance().unwrap();
        assert!(DeadListConsistentInvariant::holds(engine.state()));
    }

    #[test]
    fn test_unlisted_death_violates() {
        let mut engine = GamePhaseEngine::new(MatchSettings::new(8).with_seed(3)).unwrap();
        engine.advance().unwrap();
        let mut state = engine.snapshot();
        state.players[SeatId(4).index()].kill();
        assert!(!DeadListConsistentInvariant::holds(&state));
    }
}
