//! Role count invariant: the dealt roster matches the configured distribution.

use super::Invariant;
use crate::roles::RoleKind;
use crate::types::GameState;

/// Invariant: once dealt, the roster has one player per seat and exactly
/// the configured number of each role.
pub struct RoleCountInvariant;

impl Invariant<GameState> for RoleCountInvariant {
    fn holds(state: &GameState) -> bool {
        if state.players().is_empty() {
            return true;
        }
        let settings = state.settings();
        if state.players().len() != *settings.seats() {
            return false;
        }
        let seats_in_order = state
            .players()
            .iter()
            .enumerate()
            .all(|(i, p)| p.seat().index() == i);
        seats_in_order
            && RoleKind::all().all(|role| {
                let dealt = state.players().iter().filter(|p| p.role() == role).count();
                dealt == settings.roles().count(role)
            })
    }

    fn description() -> &'static str {
        "Dealt roles match the configured distribution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GamePhaseEngine, MatchSettings};

    #[test]
    fn test_dealt_roster_holds() {
        for seed in 0..20 {
            let mut engine =
                GamePhaseEngine::new(MatchSettings::new(10).with_seed(seed)).unwrap();
            engine.advance().unwrap();
            assert!(RoleCountInvariant::holds(engine.state()), "seed {seed}");
        }
    }

    #[test]
    fn test_undealt_roster_holds() {
        let engine = GamePhaseEngine::new(MatchSettings::new(10)).unwrap();
        assert!(RoleCountInvariant::holds(engine.state()));
    }
}
