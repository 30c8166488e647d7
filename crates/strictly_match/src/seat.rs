//! One AI seat: its strategy and what it believes.

use strictly_werewolf::{
    Action, EngineEvent, GamePhaseEngine, Intent, SeatId, SeatView, StrategyEngine,
    SuspicionState,
};
use tracing::{debug, instrument};

/// Strategy and suspicion model of one AI seat.
#[derive(Debug, Clone)]
pub struct SeatAgent {
    strategy: StrategyEngine,
    suspicion: SuspicionState,
}

impl SeatAgent {
    /// Agent for `seat`, or `None` if the seat is human or not dealt yet.
    ///
    /// Each seat draws decisions from `seed + seat`, so a fixed match seed
    /// reproduces every AI decision.
    #[instrument(skip(engine))]
    pub fn for_seat(engine: &GamePhaseEngine, seat: SeatId, seed: u64) -> Option<Self> {
        let player = engine.state().player(seat)?;
        let personality = *player.personality()?;
        let view = engine.view_for(seat)?;
        let strategy = StrategyEngine::new(seat, personality, seed.wrapping_add(seat.index() as u64));
        let mut suspicion = SuspicionState::new(seat, engine.state().players().iter().map(|p| p.seat()));
        strategy.prime(&view, &mut suspicion);
        debug!(role = %player.role(), "Seat agent ready");
        Some(Self {
            strategy,
            suspicion,
        })
    }

    /// Seat this agent plays.
    pub fn seat(&self) -> SeatId {
        self.strategy.seat()
    }

    /// Current beliefs.
    pub fn suspicion(&self) -> &SuspicionState {
        &self.suspicion
    }

    /// Feeds one engine event into the beliefs.
    pub fn observe(&mut self, view: &SeatView, event: &EngineEvent) {
        self.strategy.observe(view, event, &mut self.suspicion);
    }

    /// Night ability, or a pass when the strategy skips.
    pub fn night_action(&mut self, view: &SeatView) -> Action {
        self.strategy
            .decide_night_action(view, &self.suspicion)
            .and_then(|d| d.action())
            .unwrap_or(Action::Pass)
    }

    /// Vote, or an abstention.
    pub fn vote(&mut self, view: &SeatView) -> Action {
        self.strategy
            .decide_vote(view, &self.suspicion)
            .and_then(|d| d.action())
            .unwrap_or(Action::Pass)
    }

    /// Hunter shot, or holding fire.
    pub fn hunter_shot(&mut self, view: &SeatView) -> Action {
        self.strategy
            .decide_hunter_shot(view, &self.suspicion)
            .map(Action::Shoot)
            .unwrap_or(Action::HoldFire)
    }

    /// What to say with the floor.
    pub fn speech_intent(&mut self, view: &SeatView) -> Intent {
        self.strategy.decide_speech_intent(view, &self.suspicion).intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_werewolf::{MatchSettings, RoleKind};

    fn engine() -> GamePhaseEngine {
        let roles = vec![
            RoleKind::Werewolf,
            RoleKind::Werewolf,
            RoleKind::Seer,
            RoleKind::Villager,
            RoleKind::Villager,
            RoleKind::Hunter,
        ];
        let settings = MatchSettings::new(roles.len())
            .with_human_seat(SeatId(3))
            .with_seed(11);
        let mut engine = GamePhaseEngine::with_roles(settings, roles).unwrap();
        engine.advance().unwrap();
        engine
    }

    #[test]
    fn test_no_agent_for_human_seat() {
        let engine = engine();
        assert!(SeatAgent::for_seat(&engine, SeatId(3), 1).is_none());
        assert!(SeatAgent::for_seat(&engine, SeatId(9), 1).is_none());
    }

    #[test]
    fn test_wolf_trusts_packmate() {
        let engine = engine();
        let agent = SeatAgent::for_seat(&engine, SeatId(0), 1).unwrap();
        assert_eq!(agent.seat(), SeatId(0));
        assert_eq!(agent.suspicion().score(SeatId(1)), 0.0);
        assert!(agent.suspicion().is_pinned(SeatId(1)));
    }

    #[test]
    fn test_villager_passes_at_night() {
        let engine = engine();
        let mut agent = SeatAgent::for_seat(&engine, SeatId(4), 1).unwrap();
        let view = engine.view_for(SeatId(4)).unwrap();
        assert_eq!(agent.night_action(&view), Action::Pass);
    }
}
