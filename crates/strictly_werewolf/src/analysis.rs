//! Reading the public record: accusation pressure and the meaning of free text.

use crate::roles::{Faction, RoleKind};
use crate::types::{RoleClaim, SeatId, SpeechKind};
use crate::view::SeatView;
use tracing::instrument;

const ACCUSATION_WORDS: [&str; 9] = [
    "wolf", "werewolf", "suspicious", "sus", "lying", "liar", "vote", "accuse", "kill",
];
const DEFENSE_PHRASES: [&str; 7] = [
    "not me",
    "i'm innocent",
    "i am innocent",
    "trust me",
    "i'm not a wolf",
    "i am not a wolf",
    "i'm on your side",
];
const GOOD_WORDS: [&str; 5] = ["good", "innocent", "villager", "clean", "safe"];
const CLAIMABLE: [RoleKind; 4] = [
    RoleKind::Seer,
    RoleKind::Witch,
    RoleKind::Guard,
    RoleKind::Hunter,
];

/// How hard the table is pushing against `seat`, in `[0, 1]`.
///
/// Counts distinct seats accusing it today and, at half weight, distinct
/// seats that voted for it in the most recent closed vote, relative to the
/// number of other living seats.
pub fn accusation_pressure(view: &SeatView, seat: SeatId) -> f32 {
    let others = view.living().filter(|s| *s != seat).count().max(1) as f32;

    let mut accusers: Vec<SeatId> = view
        .speeches_today()
        .filter(|s| s.kind == Some(SpeechKind::Accusation(seat)) && s.seat != seat)
        .map(|s| s.seat)
        .collect();
    accusers.sort();
    accusers.dedup();

    let last_day = view.vote_history.iter().map(|v| v.day).max();
    let voters = view
        .vote_history
        .iter()
        .filter(|v| Some(v.day) == last_day && v.target == seat)
        .count();

    ((accusers.len() as f32 + 0.5 * voters as f32) / others).min(1.0)
}

/// Seat named in `text`, by display name, `seat N` or `#N`.
pub fn mentioned_seat(text: &str, view: &SeatView) -> Option<SeatId> {
    let lowered = text.to_lowercase();
    let by_name = view.roster.iter().find(|p| {
        p.seat != view.seat
            && lowered
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == p.name.to_lowercase())
    });
    if let Some(p) = by_name {
        return Some(p.seat);
    }

    let words: Vec<&str> = lowered.split_whitespace().collect();
    let numbered = words.iter().enumerate().find_map(|(i, word)| {
        let digits = if let Some(rest) = word.strip_prefix('#') {
            Some(rest)
        } else if *word == "seat" {
            words.get(i + 1).copied()
        } else {
            None
        }?;
        let digits: String = digits.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<usize>().ok()
    });
    numbered
        .map(SeatId)
        .filter(|s| s.index() < view.roster.len())
}

/// Infers the meaning of free text spoken by the viewer.
///
/// Role claims win over defenses, defenses over accusations. Text that
/// names nobody and matches nothing is a strategy comment.
#[instrument(skip(view), fields(seat = %view.seat))]
pub fn infer_intent(text: &str, view: &SeatView) -> Option<SpeechKind> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    let named = mentioned_seat(&lowered, view);
    let has_word = |words: &[&str]| {
        lowered
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .any(|w| words.contains(&w))
    };

    let claimed = CLAIMABLE.into_iter().find(|role| {
        let name = role.to_string().to_lowercase();
        [format!("i am the {name}"), format!("i'm the {name}"), format!("as the {name}")]
            .iter()
            .any(|phrase| lowered.contains(phrase.as_str()))
    });
    if let Some(role) = claimed {
        let finding = named.and_then(|target| {
            if has_word(&["wolf", "werewolf"]) {
                Some((target, Faction::Werewolf))
            } else if has_word(&GOOD_WORDS) {
                Some((target, Faction::Villager))
            } else {
                None
            }
        });
        return Some(SpeechKind::Information(Some(RoleClaim { role, finding })));
    }

    if DEFENSE_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(SpeechKind::Defense);
    }
    if let Some(target) = named
        && has_word(&ACCUSATION_WORDS)
    {
        return Some(SpeechKind::Accusation(target));
    }
    Some(SpeechKind::StrategyComment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, GamePhaseEngine, MatchSettings, Speech};

    fn view_in_discussion() -> (GamePhaseEngine, SeatView) {
        let roles = vec![
            RoleKind::Werewolf,
            RoleKind::Seer,
            RoleKind::Villager,
            RoleKind::Villager,
            RoleKind::Villager,
            RoleKind::Werewolf,
        ];
        let settings = MatchSettings::new(6).with_human_seat(SeatId(2));
        let mut engine = GamePhaseEngine::with_roles(settings, roles).unwrap();
        engine.advance().unwrap();
        engine.advance().unwrap();
        let view = engine.view_for(SeatId(2)).unwrap();
        (engine, view)
    }

    #[test]
    fn test_accusation_by_name() {
        let (_, view) = view_in_discussion();
        let name = view.name_of(SeatId(4)).to_string();
        assert_eq!(
            infer_intent(&format!("I think {name} is a wolf"), &view),
            Some(SpeechKind::Accusation(SeatId(4)))
        );
    }

    #[test]
    fn test_accusation_by_seat_number() {
        let (_, view) = view_in_discussion();
        assert_eq!(
            infer_intent("seat 5 is lying, vote them out", &view),
            Some(SpeechKind::Accusation(SeatId(5)))
        );
        assert_eq!(
            infer_intent("#3 looks sus", &view),
            Some(SpeechKind::Accusation(SeatId(3)))
        );
    }

    #[test]
    fn test_seer_claim_with_finding() {
        let (_, view) = view_in_discussion();
        assert_eq!(
            infer_intent("I am the seer and seat 0 is a werewolf", &view),
            Some(SpeechKind::Information(Some(RoleClaim {
                role: RoleKind::Seer,
                finding: Some((SeatId(0), Faction::Werewolf)),
            })))
        );
    }

    #[test]
    fn test_defense_and_comment() {
        let (_, view) = view_in_discussion();
        assert_eq!(infer_intent("It's not me, I swear", &view), Some(SpeechKind::Defense));
        assert_eq!(
            infer_intent("we should be careful tonight", &view),
            Some(SpeechKind::StrategyComment)
        );
        assert_eq!(infer_intent("   ", &view), None);
    }

    #[test]
    fn test_pressure_counts_distinct_accusers() {
        let (mut engine, _) = view_in_discussion();
        let accuse = |t| Action::Speak(Speech::new("you", Some(SpeechKind::Accusation(SeatId(t)))));
        engine.apply_action(SeatId(0), accuse(3)).unwrap();
        engine.apply_action(SeatId(1), accuse(3)).unwrap();
        let view = engine.view_for(SeatId(3)).unwrap();
        let pressure = accusation_pressure(&view, SeatId(3));
        assert!((pressure - 2.0 / 5.0).abs() < 1e-6);
        assert_eq!(accusation_pressure(&view, SeatId(4)), 0.0);
    }
}
