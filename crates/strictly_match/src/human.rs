//! Text commands typed by the human seat.

use strictly_werewolf::{
    infer_intent, AbilityKind, Action, NightAbility, SeatId, SeatView, Speech,
};
use tracing::{debug, instrument};

/// Why a command line could not be turned into an action.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CommandError {
    /// Nothing was typed.
    #[display("empty command")]
    Empty,
    /// The first word is not a command.
    #[display("unknown command '{_0}' (try: vote, say, pass, kill, protect, inspect, heal, poison, shoot, hold)")]
    Unknown(String),
    /// The command needs a seat.
    #[display("'{_0}' needs a seat number or name")]
    MissingTarget(String),
    /// The seat could not be resolved.
    #[display("no seat matches '{_0}'")]
    UnknownSeat(String),
    /// `say` without text.
    #[display("say what?")]
    NothingToSay,
    /// `heal` with no wolf victim to save.
    #[display("there is no victim to heal tonight")]
    NoVictim,
}

impl std::error::Error for CommandError {}

/// Resolves a seat by index or by display name.
fn resolve_seat(word: &str, view: Option<&SeatView>) -> Result<SeatId, CommandError> {
    let word = word.trim().trim_start_matches('#');
    if let Ok(index) = word.parse::<usize>() {
        let known = view.is_none_or(|v| index < v.roster.len());
        return if known {
            Ok(SeatId(index))
        } else {
            Err(CommandError::UnknownSeat(word.to_string()))
        };
    }
    view.and_then(|v| {
        v.roster
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(word))
            .map(|p| p.seat)
    })
    .ok_or_else(|| CommandError::UnknownSeat(word.to_string()))
}

/// Parses one line into an action for the seat whose view is given.
///
/// Seats are zero-based indices or display names. `say` infers the
/// meaning of the text from the view; `heal` targets tonight's victim.
#[instrument(skip(view))]
pub fn parse_command(line: &str, view: Option<&SeatView>) -> Result<Action, CommandError> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));
    if verb.is_empty() {
        return Err(CommandError::Empty);
    }
    let verb = verb.to_lowercase();

    let target = || {
        if rest.is_empty() {
            Err(CommandError::MissingTarget(verb.clone()))
        } else {
            resolve_seat(rest, view)
        }
    };
    let ability = |kind| target().map(|seat| Action::NightAbility(NightAbility::new(kind, seat)));

    let action = match verb.as_str() {
        "vote" => Action::Vote(target()?),
        "say" => {
            if rest.is_empty() {
                return Err(CommandError::NothingToSay);
            }
            let kind = view.and_then(|v| infer_intent(rest, v));
            Action::Speak(Speech::new(rest, kind))
        }
        "pass" | "skip" => Action::Pass,
        "kill" => ability(AbilityKind::Kill)?,
        "protect" | "guard" => ability(AbilityKind::Protect)?,
        "inspect" | "check" => ability(AbilityKind::Inspect)?,
        "poison" => ability(AbilityKind::Poison)?,
        "heal" | "save" => {
            let victim = view
                .and_then(|v| v.wolf_target)
                .ok_or(CommandError::NoVictim)?;
            Action::NightAbility(NightAbility::new(AbilityKind::Heal, victim))
        }
        "shoot" => Action::Shoot(target()?),
        "hold" => Action::HoldFire,
        _ => return Err(CommandError::Unknown(verb.clone())),
    };
    debug!(action = action.label(), "Parsed command");
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_werewolf::{GamePhaseEngine, MatchSettings, RoleKind, SpeechKind};

    fn witch_view() -> SeatView {
        let roles = vec![
            RoleKind::Werewolf,
            RoleKind::Villager,
            RoleKind::Witch,
            RoleKind::Villager,
            RoleKind::Seer,
            RoleKind::Villager,
        ];
        let settings = MatchSettings::new(roles.len()).with_human_seat(SeatId(2));
        let mut engine = GamePhaseEngine::with_roles(settings, roles).unwrap();
        engine.advance().unwrap();
        engine
            .apply_action(
                SeatId(0),
                Action::NightAbility(NightAbility::new(AbilityKind::Kill, SeatId(3))),
            )
            .unwrap();
        engine.view_for(SeatId(2)).unwrap()
    }

    #[test]
    fn test_vote_by_index_and_name() {
        let view = witch_view();
        assert_eq!(parse_command("vote 4", Some(&view)), Ok(Action::Vote(SeatId(4))));
        let name = view.name_of(SeatId(1)).to_uppercase();
        assert_eq!(
            parse_command(&format!("vote {name}"), Some(&view)),
            Ok(Action::Vote(SeatId(1)))
        );
    }

    #[test]
    fn test_heal_targets_tonights_victim() {
        let view = witch_view();
        assert_eq!(
            parse_command("heal", Some(&view)),
            Ok(Action::NightAbility(NightAbility::new(AbilityKind::Heal, SeatId(3))))
        );
        assert_eq!(parse_command("heal", None), Err(CommandError::NoVictim));
    }

    #[test]
    fn test_say_infers_accusation() {
        let view = witch_view();
        let line = format!("say I think {} is a wolf", view.name_of(SeatId(0)));
        let Ok(Action::Speak(speech)) = parse_command(&line, Some(&view)) else {
            panic!("expected speech");
        };
        assert_eq!(speech.kind, Some(SpeechKind::Accusation(SeatId(0))));
    }

    #[test]
    fn test_errors_are_specific() {
        let view = witch_view();
        assert_eq!(parse_command("   ", Some(&view)), Err(CommandError::Empty));
        assert_eq!(
            parse_command("vote", Some(&view)),
            Err(CommandError::MissingTarget("vote".to_string()))
        );
        assert_eq!(
            parse_command("vote 42", Some(&view)),
            Err(CommandError::UnknownSeat("42".to_string()))
        );
        assert_eq!(parse_command("say", Some(&view)), Err(CommandError::NothingToSay));
        assert!(matches!(
            parse_command("dance", Some(&view)),
            Err(CommandError::Unknown(_))
        ));
    }

    #[test]
    fn test_simple_verbs() {
        assert_eq!(parse_command("pass", None), Ok(Action::Pass));
        assert_eq!(parse_command("HOLD", None), Ok(Action::HoldFire));
        assert_eq!(parse_command("shoot 3", None), Ok(Action::Shoot(SeatId(3))));
    }
}
