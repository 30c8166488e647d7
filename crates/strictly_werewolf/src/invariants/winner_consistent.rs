//! Winner invariant: the recorded winner always agrees with the roster.

use super::Invariant;
use crate::rules::check_winner;
use crate::types::{GameState, Phase};

/// Invariant: a winner is set exactly when the match is over, and it is the
/// faction the win rule picks for the current roster.
pub struct WinnerConsistentInvariant;

impl Invariant<GameState> for WinnerConsistentInvariant {
    fn holds(state: &GameState) -> bool {
        if state.phase() == Phase::Preparation {
            return state.winner().is_none();
        }
        let expected = check_winner(state.players(), *state.settings().win_policy());
        (state.phase() == Phase::Over) == state.winner().is_some() && state.winner() == expected
    }

    fn description() -> &'static str {
        "Winner is set exactly when a faction has won"
    }
}
