//! Property tests over random configurations and random match traces.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use strictly_werewolf::{
    tally, Action, Faction, GamePhaseEngine, MatchSettings, NightAbility, Phase,
    RoleDistribution, RoleKind, SeatId, Speech, VoteRecord,
};

/// Valid distribution: at least one wolf, fewer wolves than seats, optional
/// special roles and villagers for the rest.
fn distribution() -> impl Strategy<Value = RoleDistribution> {
    (4usize..=16)
        .prop_flat_map(|seats| {
            (
                Just(seats),
                1..seats,
                proptest::collection::vec(any::<bool>(), 4),
            )
        })
        .prop_filter_map("roles must fit", |(seats, wolves, specials)| {
            let chosen: Vec<RoleKind> = [
                RoleKind::Seer,
                RoleKind::Witch,
                RoleKind::Guard,
                RoleKind::Hunter,
            ]
            .into_iter()
            .zip(specials)
            .filter_map(|(role, on)| on.then_some(role))
            .collect();
            let villagers = seats.checked_sub(wolves + chosen.len())?;
            let dist: RoleDistribution = chosen
                .into_iter()
                .map(|role| (role, 1))
                .chain([(RoleKind::Werewolf, wolves), (RoleKind::Villager, villagers)])
                .collect();
            Some(dist)
        })
}

fn random_target(rng: &mut StdRng, living: &[SeatId], actor: SeatId) -> Option<SeatId> {
    let others: Vec<SeatId> = living.iter().copied().filter(|s| *s != actor).collect();
    others.choose(rng).copied()
}

/// Plays one step of the current phase with random, mostly legal actions.
fn play_phase(engine: &mut GamePhaseEngine, rng: &mut StdRng) {
    let living: Vec<SeatId> = engine.state().living().map(|p| p.seat()).collect();
    match engine.state().phase() {
        Phase::Night => {
            for seat in &living {
                let Some(role) = engine.state().player(*seat).map(|p| p.role()) else {
                    continue;
                };
                let Some(kind) = role.abilities().choose(rng).copied() else {
                    continue;
                };
                if let Some(target) = random_target(rng, &living, *seat) {
                    let action = Action::NightAbility(NightAbility::new(kind, target));
                    let _ = engine.apply_action(*seat, action);
                }
            }
        }
        Phase::Discussion | Phase::LastWords => {
            for _ in 0..64 {
                let state_living: Vec<SeatId> = engine.state().living().map(|p| p.seat()).collect();
                if let Some(hunter) = engine.state().pending_shot() {
                    let shot = random_target(rng, &state_living, hunter)
                        .filter(|_| rng.gen_bool(0.5))
                        .map(Action::Shoot)
                        .unwrap_or(Action::HoldFire);
                    if engine.apply_action(hunter, shot).is_err() {
                        engine.apply_action(hunter, Action::HoldFire).unwrap();
                    }
                    continue;
                }
                let Some(speaker) = engine.state().current_speaker() else {
                    break;
                };
                let action = if rng.gen_bool(0.5) {
                    Action::Speak(Speech::new("hmm", None))
                } else {
                    Action::Pass
                };
                engine.apply_action(speaker, action).unwrap();
            }
        }
        Phase::Voting => {
            for seat in &living {
                let action = match random_target(rng, &living, *seat) {
                    Some(target) if rng.gen_bool(0.8) => Action::Vote(target),
                    _ => Action::Pass,
                };
                let _ = engine.apply_action(*seat, action);
            }
        }
        Phase::Preparation | Phase::Over => {}
    }
}

fn alive_flags(engine: &GamePhaseEngine) -> Vec<bool> {
    engine.state().players().iter().map(|p| p.is_alive()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_preparation_deals_configured_counts(dist in distribution(), seed in any::<u64>()) {
        let seats = dist.total();
        let settings = MatchSettings::new(seats).with_roles(dist.clone()).with_seed(seed);
        let mut engine = GamePhaseEngine::new(settings).unwrap();
        engine.advance().unwrap();

        let players = engine.state().players();
        prop_assert_eq!(players.len(), seats);
        for (role, count) in dist.iter() {
            let dealt = players.iter().filter(|p| p.role() == role).count();
            prop_assert_eq!(dealt, count);
        }
        prop_assert!(engine.check_invariants().is_ok());
    }

    #[test]
    fn prop_alive_flags_never_return(dist in distribution(), seed in any::<u64>()) {
        let seats = dist.total();
        let settings = MatchSettings::new(seats).with_roles(dist).with_seed(seed);
        let mut engine = GamePhaseEngine::new(settings).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        engine.advance().unwrap();
        let mut previous = alive_flags(&engine);

        for _ in 0..200 {
            if engine.state().phase() == Phase::Over {
                break;
            }
            play_phase(&mut engine, &mut rng);
            engine.advance().unwrap();

            let current = alive_flags(&engine);
            for (before, after) in previous.iter().zip(&current) {
                prop_assert!(*before || !*after, "a dead seat came back");
            }
            prop_assert!(engine.check_invariants().is_ok());
            previous = current;
        }
    }

    #[test]
    fn prop_terminal_winner_is_consistent(dist in distribution(), seed in any::<u64>()) {
        let seats = dist.total();
        let settings = MatchSettings::new(seats).with_roles(dist).with_seed(seed);
        let mut engine = GamePhaseEngine::new(settings).unwrap();
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        engine.advance().unwrap();

        for _ in 0..200 {
            if engine.state().phase() == Phase::Over {
                break;
            }
            play_phase(&mut engine, &mut rng);
            engine.advance().unwrap();
        }

        let state = engine.state();
        if state.phase() == Phase::Over {
            let winner = state.winner();
            prop_assert!(winner.is_some());
            let winner = winner.unwrap_or(Faction::Villager);
            prop_assert_eq!(state.living_in(winner.opponent()), 0);
            if state.living().count() == 0 {
                // last wolf and last villager fell together
                prop_assert_eq!(winner, Faction::Villager);
            } else {
                prop_assert!(state.living_in(winner) > 0);
            }
        } else {
            prop_assert_eq!(state.winner(), None);
        }
    }

    #[test]
    fn prop_tally_is_reproducible(
        picks in proptest::collection::vec((0usize..8, 0usize..8), 0..24),
        shuffle_seed in any::<u64>(),
    ) {
        let votes: Vec<VoteRecord> = picks
            .iter()
            .enumerate()
            .map(|(i, (voter, target))| {
                VoteRecord::new(SeatId(*voter), SeatId(*target), 1, Phase::Voting, i as u64, chrono::Utc::now())
            })
            .collect();
        let first = tally(&votes);
        prop_assert_eq!(&tally(&votes), &first);

        let mut shuffled = votes.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(shuffle_seed));
        prop_assert_eq!(tally(&shuffled), first);
    }
}
