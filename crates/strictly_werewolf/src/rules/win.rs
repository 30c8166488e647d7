//! Win detection.

use crate::roles::Faction;
use crate::settings::WinPolicy;
use crate::types::Player;
use tracing::instrument;

/// Checks whether a faction has won.
///
/// Zero living wolves is always a villager win, including the empty table
/// left when the last wolf and the last non-wolf die together. Wolves win
/// when no non-wolf is left, or under [`WinPolicy::WolfParity`] once they
/// are at least as many as the non-wolves.
#[instrument(skip(players))]
pub fn check_winner(players: &[Player], policy: WinPolicy) -> Option<Faction> {
    let living = players.iter().filter(|p| p.is_alive());
    let (wolves, villagers) = living.fold((0usize, 0usize), |(w, v), p| match p.faction() {
        Faction::Werewolf => (w + 1, v),
        Faction::Villager => (w, v + 1),
    });

    if wolves == 0 {
        return Some(Faction::Villager);
    }
    let wolves_win = match policy {
        WinPolicy::Elimination => villagers == 0,
        WinPolicy::WolfParity => wolves >= villagers,
    };
    wolves_win.then_some(Faction::Werewolf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleKind;
    use crate::types::SeatId;

    fn roster(roles: &[(RoleKind, bool)]) -> Vec<Player> {
        roles
            .iter()
            .enumerate()
            .map(|(i, (role, alive))| {
                let mut p = Player::new(SeatId(i), format!("p{i}"), *role, false, None);
                if !alive {
                    p.kill();
                }
                p
            })
            .collect()
    }

    #[test]
    fn test_no_wolves_villagers_win() {
        let players = roster(&[(RoleKind::Werewolf, false), (RoleKind::Villager, true)]);
        assert_eq!(
            check_winner(&players, WinPolicy::Elimination),
            Some(Faction::Villager)
        );
    }

    #[test]
    fn test_empty_table_goes_to_villagers() {
        let players = roster(&[
            (RoleKind::Werewolf, false),
            (RoleKind::Witch, false),
            (RoleKind::Villager, false),
        ]);
        for policy in [WinPolicy::Elimination, WinPolicy::WolfParity] {
            assert_eq!(check_winner(&players, policy), Some(Faction::Villager));
        }
    }

    #[test]
    fn test_parity_only_counts_under_parity_policy() {
        let players = roster(&[
            (RoleKind::Werewolf, true),
            (RoleKind::Seer, true),
            (RoleKind::Villager, false),
        ]);
        assert_eq!(check_winner(&players, WinPolicy::Elimination), None);
        assert_eq!(
            check_winner(&players, WinPolicy::WolfParity),
            Some(Faction::Werewolf)
        );
    }

    #[test]
    fn test_no_villagers_wolves_win() {
        let players = roster(&[(RoleKind::Werewolf, true), (RoleKind::Villager, false)]);
        assert_eq!(
            check_winner(&players, WinPolicy::Elimination),
            Some(Faction::Werewolf)
        );
    }

    #[test]
    fn test_ongoing_game_has_no_winner() {
        let players = roster(&[
            (RoleKind::Werewolf, true),
            (RoleKind::Villager, true),
            (RoleKind::Villager, true),
        ]);
        assert_eq!(check_winner(&players, WinPolicy::WolfParity), None);
    }
}
