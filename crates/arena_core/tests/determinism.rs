//! Determinism checks over the scripted fixtures.
//!
//! The same inputs must produce bit-identical games on every run, on every
//! thread, and after a save/restore.

use std::collections::BTreeMap;

use arena_core::prelude::*;
use arena_test_utils::determinism::strategies::arb_command_file;
use arena_test_utils::determinism::{
    find_first_divergence, run_parallel_scenarios, verify_scenario_determinism,
    verify_serialization_determinism,
};
use arena_test_utils::fixtures::{catalog, game_from_roster, idle_duel, laser_duel, melee};
use arena_test_utils::proptest::prelude::*;

#[test]
fn test_fixtures_are_deterministic() {
    assert!(verify_scenario_determinism(idle_duel, 2));
    assert!(verify_scenario_determinism(laser_duel, 2));
    assert!(verify_scenario_determinism(melee, 3));
}

#[test]
fn test_no_divergence_round_by_round() {
    assert_eq!(find_first_divergence(melee, 3), None);
}

#[test]
fn test_parallel_runs_agree() {
    let result = run_parallel_scenarios(melee, 4, 2);
    result.assert_deterministic();
    assert_eq!(result.hashes.len(), 4);
}

#[test]
fn test_restored_game_plays_on_identically() {
    assert!(verify_serialization_determinism(laser_duel, 1));
    assert!(verify_serialization_determinism(melee, 1));
}

#[test]
fn test_melee_records_replay() {
    let mut scenario = melee();
    for _ in 0..2 {
        let files = scenario.next_files();
        let (record, report) =
            RoundRecord::capture(&mut scenario.game, &scenario.catalog, &files).unwrap();
        assert_eq!(record.round, report.round);

        let replayed = record.verify(&scenario.catalog).unwrap();
        assert_eq!(replayed.state_hash(), scenario.game.state_hash());
        assert_eq!(replayed, scenario.game);
    }
}

#[test]
fn test_idle_ships_stay_put() {
    let mut scenario = idle_duel();
    let before: Vec<_> = scenario
        .game
        .entities()
        .iter()
        .map(|(_, e)| (e.vector, e.hull))
        .collect();
    scenario.play_next();
    let after: Vec<_> = scenario
        .game
        .entities()
        .iter()
        .map(|(_, e)| (e.vector, e.hull))
        .collect();
    assert_eq!(before, after);
    assert_eq!(scenario.game.round(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Arbitrary command files never break a round and always replay the same.
    #[test]
    fn prop_arbitrary_orders_are_deterministic(
        ajax in arb_command_file("Bremen", 8),
        bremen in arb_command_file("Ajax", 8),
    ) {
        let catalog = catalog();
        let roster = "Ajax H2545 Red alice 0 0\nBremen H2552 Blue bob 40 80\n";
        let files = BTreeMap::from([
            ("Ajax".to_string(), ajax),
            ("Bremen".to_string(), bremen),
        ]);

        let mut first = game_from_roster(&catalog, roster);
        let mut second = game_from_roster(&catalog, roster);
        let a = first.play_round(&catalog, &files).unwrap();
        let b = second.play_round(&catalog, &files).unwrap();

        prop_assert_eq!(a.state_hash, b.state_hash);
        prop_assert_eq!(first, second);
    }
}
