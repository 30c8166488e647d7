//! Role catalog: every role, its faction, and the night ability it holds.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator};

/// Team a role belongs to. The game ends when one faction wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
pub enum Faction {
    /// The werewolves.
    #[display("Werewolves")]
    Werewolf,
    /// Everyone else.
    #[display("Villagers")]
    Villager,
}

impl Faction {
    /// Returns the opposing faction.
    pub fn opponent(self) -> Self {
        match self {
            Faction::Werewolf => Faction::Villager,
            Faction::Villager => Faction::Werewolf,
        }
    }
}

/// Kind of night ability a role may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum AbilityKind {
    /// Werewolves choose a victim together.
    #[display("kill")]
    Kill,
    /// Seer learns the faction of one living seat.
    #[display("inspect")]
    Inspect,
    /// Witch saves tonight's wolf victim (once per match).
    #[display("heal")]
    Heal,
    /// Witch kills one living seat (once per match).
    #[display("poison")]
    Poison,
    /// Guard shields one seat from the wolf attack.
    #[display("protect")]
    Protect,
}

/// Which round of the night a role acts in.
///
/// The witch acts after the wolves so she can see their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NightRound {
    /// Wolves, seer and guard.
    First,
    /// Witch.
    Second,
}

/// Every role a seat can hold.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// Member of the wolf pack.
    #[strum(serialize = "werewolf", serialize = "wolf")]
    Werewolf,
    /// Plain villager with no ability.
    Villager,
    /// Inspects one seat per night.
    Seer,
    /// Holds one heal and one poison.
    Witch,
    /// Fires a shot when killed by wolves or by vote.
    Hunter,
    /// Protects one seat per night.
    Guard,
}

impl RoleKind {
    /// Faction this role plays for.
    pub fn faction(self) -> Faction {
        match self {
            RoleKind::Werewolf => Faction::Werewolf,
            _ => Faction::Villager,
        }
    }

    /// Night abilities this role may use.
    pub fn abilities(self) -> &'static [AbilityKind] {
        match self {
            RoleKind::Werewolf => &[AbilityKind::Kill],
            RoleKind::Seer => &[AbilityKind::Inspect],
            RoleKind::Witch => &[AbilityKind::Heal, AbilityKind::Poison],
            RoleKind::Guard => &[AbilityKind::Protect],
            RoleKind::Villager | RoleKind::Hunter => &[],
        }
    }

    /// Whether this role acts at night at all.
    pub fn acts_at_night(self) -> bool {
        !self.abilities().is_empty()
    }

    /// Night round this role acts in, if any.
    pub fn night_round(self) -> Option<NightRound> {
        match self {
            RoleKind::Werewolf | RoleKind::Seer | RoleKind::Guard => Some(NightRound::First),
            RoleKind::Witch => Some(NightRound::Second),
            RoleKind::Villager | RoleKind::Hunter => None,
        }
    }

    /// Whether this role may use the given ability.
    pub fn has_ability(self, kind: AbilityKind) -> bool {
        self.abilities().contains(&kind)
    }

    /// Whether a second living claimant of this role is necessarily lying.
    pub fn is_unique_claim(self) -> bool {
        !matches!(self, RoleKind::Werewolf | RoleKind::Villager)
    }

    /// One-line description shown to the seat holding this role.
    pub fn briefing(self) -> &'static str {
        match self {
            RoleKind::Werewolf => "Each night, agree with your pack on a villager to kill.",
            RoleKind::Villager => "Find the werewolves through discussion and voting.",
            RoleKind::Seer => "Each night, inspect one seat and learn its faction.",
            RoleKind::Witch => "You hold one healing potion and one poison for the whole match.",
            RoleKind::Hunter => "If wolves or the village kill you, you may shoot one seat.",
            RoleKind::Guard => "Each night, protect one seat from the wolf attack.",
        }
    }

    /// All roles in catalog order.
    pub fn all() -> impl Iterator<Item = RoleKind> {
        RoleKind::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_only_werewolf_is_wolf_faction() {
        for role in RoleKind::all() {
            let expected = if role == RoleKind::Werewolf {
                Faction::Werewolf
            } else {
                Faction::Villager
            };
            assert_eq!(role.faction(), expected, "{role}");
        }
    }

    #[test]
    fn test_witch_acts_in_second_round() {
        assert_eq!(RoleKind::Witch.night_round(), Some(NightRound::Second));
        assert_eq!(RoleKind::Guard.night_round(), Some(NightRound::First));
        assert_eq!(RoleKind::Hunter.night_round(), None);
    }

    #[test]
    fn test_parse_role_aliases() {
        assert_eq!(RoleKind::from_str("wolf").ok(), Some(RoleKind::Werewolf));
        assert_eq!(RoleKind::from_str("Seer").ok(), Some(RoleKind::Seer));
        assert!(RoleKind::from_str("mayor").is_err());
    }
}
