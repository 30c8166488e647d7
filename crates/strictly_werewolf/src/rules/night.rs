//! Night resolution.
//!
//! Abilities are collected into a [`NightLedger`] and resolved together in
//! fixed priority: protect, heal, kill, poison, inspect.

use super::vote::leading_target;
use crate::action::NightAbility;
use crate::roles::{AbilityKind, Faction, RoleKind};
use crate::types::{Death, DeathCause, Player, SeatId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Night abilities submitted so far tonight, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightLedger {
    pub(crate) wolf_votes: Vec<(SeatId, SeatId)>,
    pub(crate) protections: Vec<(SeatId, SeatId)>,
    pub(crate) heals: Vec<(SeatId, SeatId)>,
    pub(crate) poisons: Vec<(SeatId, SeatId)>,
    pub(crate) inspections: Vec<(SeatId, SeatId)>,
    pub(crate) acted: BTreeSet<SeatId>,
}

impl NightLedger {
    /// Victim the pack agrees on so far: most votes, earliest choice on a tie.
    pub fn wolf_target(&self) -> Option<SeatId> {
        leading_target(self.wolf_votes.iter().map(|(_, target)| *target))
    }

    /// Whether `seat` has used or skipped its ability tonight.
    pub fn has_acted(&self, seat: SeatId) -> bool {
        self.acted.contains(&seat)
    }

    /// Records an ability. Validation happens before this is called.
    pub(crate) fn record(&mut self, actor: SeatId, ability: NightAbility) {
        let entry = (actor, ability.target);
        match ability.kind {
            AbilityKind::Kill => self.wolf_votes.push(entry),
            AbilityKind::Protect => self.protections.push(entry),
            AbilityKind::Heal => self.heals.push(entry),
            AbilityKind::Poison => self.poisons.push(entry),
            AbilityKind::Inspect => self.inspections.push(entry),
        }
        self.acted.insert(actor);
    }

    /// Records that `actor` skips its ability tonight.
    pub(crate) fn skip(&mut self, actor: SeatId) {
        self.acted.insert(actor);
    }
}

/// A seer's finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    /// Seer who inspected.
    pub seer: SeatId,
    /// Inspected seat.
    pub target: SeatId,
    /// Faction of the inspected seat.
    pub faction: Faction,
}

/// Outcome of one night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightReport {
    /// Day the night opened.
    pub day: u32,
    /// Victim chosen by the pack.
    pub wolf_target: Option<SeatId>,
    /// Victim who survived thanks to a guard or a heal.
    pub saved: Option<SeatId>,
    /// Deaths, wolf victim first, each seat at most once.
    pub deaths: Vec<Death>,
    /// Findings delivered to surviving seers.
    pub inspections: Vec<Inspection>,
    /// Hunter killed by the wolves who now gets a shot.
    pub hunter_trigger: Option<SeatId>,
}

/// Resolves the night's abilities against the roster.
///
/// Protect and heal both cancel the wolf kill. Poison cannot be blocked.
/// A seat hit by both kill and poison dies once, of the kill. Seers who die
/// tonight receive nothing.
#[instrument(skip(ledger, players), fields(wolf_votes = ledger.wolf_votes.len()))]
pub fn resolve_night(ledger: &NightLedger, players: &[Player], day: u32) -> NightReport {
    let alive = |seat: SeatId| players.get(seat.index()).is_some_and(Player::is_alive);

    let wolf_target = ledger.wolf_target().filter(|t| alive(*t));
    let protected: BTreeSet<SeatId> = ledger.protections.iter().map(|(_, t)| *t).collect();
    let healed: BTreeSet<SeatId> = ledger.heals.iter().map(|(_, t)| *t).collect();

    let mut deaths: Vec<Death> = Vec::new();
    let mut saved = None;

    if let Some(victim) = wolf_target {
        if protected.contains(&victim) || healed.contains(&victim) {
            debug!(%victim, "Wolf attack prevented");
            saved = Some(victim);
        } else {
            deaths.push(Death {
                seat: victim,
                cause: DeathCause::WolfKill,
            });
        }
    }

    for (_, target) in &ledger.poisons {
        if alive(*target) && !deaths.iter().any(|d| d.seat == *target) {
            deaths.push(Death {
                seat: *target,
                cause: DeathCause::Poison,
            });
        }
    }

    let died = |seat: SeatId| deaths.iter().any(|d| d.seat == seat);

    let inspections = ledger
        .inspections
        .iter()
        .filter(|(seer, _)| !died(*seer))
        .filter_map(|(seer, target)| {
            players.get(target.index()).map(|p| Inspection {
                seer: *seer,
                target: *target,
                faction: p.faction(),
            })
        })
        .collect();

    let hunter_trigger = deaths
        .iter()
        .find(|d| {
            d.cause == DeathCause::WolfKill
                && players
                    .get(d.seat.index())
                    .is_some_and(|p| p.role() == RoleKind::Hunter)
        })
        .map(|d| d.seat);

    NightReport {
        day,
        wolf_target,
        saved,
        deaths,
        inspections,
        hunter_trigger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(roles: &[RoleKind]) -> Vec<Player> {
        roles
            .iter()
            .enumerate()
            .map(|(i, role)| Player::new(SeatId(i), format!("p{i}"), *role, false, None))
            .collect()
    }

    fn table() -> Vec<Player> {
        roster(&[
            RoleKind::Werewolf,
            RoleKind::Werewolf,
            RoleKind::Seer,
            RoleKind::Witch,
            RoleKind::Guard,
            RoleKind::Hunter,
            RoleKind::Villager,
            RoleKind::Villager,
        ])
    }

    fn ability(kind: AbilityKind, target: usize) -> NightAbility {
        NightAbility::new(kind, SeatId(target))
    }

    #[test]
    fn test_unopposed_kill_lands() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(0), ability(AbilityKind::Kill, 6));
        ledger.record(SeatId(1), ability(AbilityKind::Kill, 6));
        let report = resolve_night(&ledger, &table(), 1);
        assert_eq!(
            report.deaths,
            vec![Death {
                seat: SeatId(6),
                cause: DeathCause::WolfKill
            }]
        );
        assert_eq!(report.saved, None);
    }

    #[test]
    fn test_guard_blocks_kill() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(0), ability(AbilityKind::Kill, 5));
        ledger.record(SeatId(4), ability(AbilityKind::Protect, 5));
        let report = resolve_night(&ledger, &table(), 1);
        assert!(report.deaths.is_empty());
        assert_eq!(report.saved, Some(SeatId(5)));
        assert_eq!(report.hunter_trigger, None);
    }

    #[test]
    fn test_guard_and_heal_on_same_target_survives() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(0), ability(AbilityKind::Kill, 6));
        ledger.record(SeatId(4), ability(AbilityKind::Protect, 6));
        ledger.record(SeatId(3), ability(AbilityKind::Heal, 6));
        let report = resolve_night(&ledger, &table(), 1);
        assert!(report.deaths.is_empty());
        assert_eq!(report.saved, Some(SeatId(6)));
    }

    #[test]
    fn test_poison_is_not_blocked_by_guard() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(4), ability(AbilityKind::Protect, 7));
        ledger.record(SeatId(3), ability(AbilityKind::Poison, 7));
        let report = resolve_night(&ledger, &table(), 2);
        assert_eq!(report.deaths.len(), 1);
        assert_eq!(report.deaths[0].cause, DeathCause::Poison);
    }

    #[test]
    fn test_kill_and_poison_on_same_seat_count_once() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(0), ability(AbilityKind::Kill, 7));
        ledger.record(SeatId(3), ability(AbilityKind::Poison, 7));
        let report = resolve_night(&ledger, &table(), 1);
        assert_eq!(report.deaths.len(), 1);
        assert_eq!(report.deaths[0].cause, DeathCause::WolfKill);
    }

    #[test]
    fn test_wolf_split_goes_to_first_choice() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(1), ability(AbilityKind::Kill, 7));
        ledger.record(SeatId(0), ability(AbilityKind::Kill, 6));
        assert_eq!(ledger.wolf_target(), Some(SeatId(7)));
    }

    #[test]
    fn test_hunter_triggers_on_wolf_kill_only() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(0), ability(AbilityKind::Kill, 5));
        let report = resolve_night(&ledger, &table(), 1);
        assert_eq!(report.hunter_trigger, Some(SeatId(5)));

        let mut ledger = NightLedger::default();
        ledger.record(SeatId(3), ability(AbilityKind::Poison, 5));
        let report = resolve_night(&ledger, &table(), 1);
        assert_eq!(report.hunter_trigger, None);
    }

    #[test]
    fn test_dead_seer_receives_nothing() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(0), ability(AbilityKind::Kill, 2));
        ledger.record(SeatId(2), ability(AbilityKind::Inspect, 1));
        let report = resolve_night(&ledger, &table(), 1);
        assert!(report.inspections.is_empty());
    }

    #[test]
    fn test_inspection_reports_faction() {
        let mut ledger = NightLedger::default();
        ledger.record(SeatId(2), ability(AbilityKind::Inspect, 1));
        let report = resolve_night(&ledger, &table(), 1);
        assert_eq!(
            report.inspections,
            vec![Inspection {
                seer: SeatId(2),
                target: SeatId(1),
                faction: Faction::Werewolf
            }]
        );
    }
}
