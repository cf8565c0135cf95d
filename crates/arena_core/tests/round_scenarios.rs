//! Whole-round scenarios played through [`Game`].
//!
//! These tests go through the public API only: roster in, command files in,
//! histories and reports out.

use arena_core::components::{ComponentKind, Quadrant};
use arena_core::entity::Entity;
use arena_core::events::Event;
use arena_core::game::Game;
use arena_core::prelude::*;
use arena_test_utils::fixtures::{catalog, command_files, game_from_roster, idle_files};

// =============================================================================
// Helpers
// =============================================================================

fn play(game: &mut Game, catalog: &Catalog, orders: &[(&str, &str)]) -> RoundReport {
    let mut files = idle_files(game);
    files.extend(command_files(orders));
    game.play_round(catalog, &files).unwrap()
}

fn ship<'a>(game: &'a Game, name: &str) -> &'a Entity {
    game.entity_by_name(name).unwrap()
}

fn notes(entity: &Entity) -> Vec<String> {
    entity
        .history
        .iter()
        .flat_map(|(_, entry)| entry.events.iter())
        .filter_map(|event| match event {
            Event::Internal(message) => Some(message.clone()),
            _ => None,
        })
        .collect()
}

const DUEL: &str = "Ajax H2545 Red alice 0 0\nBremen H2552 Blue bob 0 300\n";

// =============================================================================
// Movement
// =============================================================================

#[test]
fn test_split_acceleration_matches_single_line() {
    let catalog = catalog();

    let mut split = game_from_roster(&catalog, DUEL);
    play(&mut split, &catalog, &[("Ajax", "1: A10\n1: A10\n4: R30\n")]);

    let mut single = game_from_roster(&catalog, DUEL);
    play(&mut single, &catalog, &[("Ajax", "1: A20\n4: R30\n")]);

    let (a, b) = (ship(&split, "Ajax"), ship(&single, "Ajax"));
    assert_eq!(a.vector, b.vector);
    assert_eq!(a.battery, b.battery);
    assert_eq!(a.vector.speed, 20);
}

#[test]
fn test_ship_moves_every_tick() {
    let catalog = catalog();
    let mut game = game_from_roster(&catalog, DUEL);
    play(&mut game, &catalog, &[("Ajax", "1: R90\n2: A10\n")]);

    let ajax = ship(&game, "Ajax");
    assert_eq!(ajax.vector.heading_f64(), 90.0);
    // turned at rest, then nine ticks at speed 10
    assert_eq!(ajax.vector.pos.distance_to(Point::from_ints(90, 0)), 0.0);
    // one tick of history per tick, plus the state before the round
    assert_eq!(ajax.history.len(), 11);
}

#[test]
fn test_heading_and_turn_on_same_tick_add_up() {
    let catalog = catalog();
    let mut game = game_from_roster(&catalog, DUEL);
    play(&mut game, &catalog, &[("Ajax", "2: H90\n2: L10\n")]);
    assert_eq!(ship(&game, "Ajax").vector.heading_f64(), 80.0);
}

// =============================================================================
// Command validation
// =============================================================================

#[test]
fn test_invalid_lines_are_reported_not_executed() {
    let catalog = catalog();
    let mut game = game_from_roster(&catalog, DUEL);
    play(
        &mut game,
        &catalog,
        &[("Ajax", "1: A99\n2: F Z9 Bremen\n3: Boost X 10\nwarp 9\n12: A5\n")],
    );

    let ajax = ship(&game, "Ajax");
    assert_eq!(ajax.vector.speed, 0);
    let notes = notes(ajax);
    assert!(notes.iter().any(|n| n.contains("99 is outside max acceleration.")));
    assert!(notes.iter().any(|n| n.contains("Z9 is not a weapon of Ajax.")));
    assert!(notes.iter().any(|n| n.starts_with("Line 4 \"warp 9\"")));
    assert!(notes.iter().any(|n| n.starts_with("Line 5 \"12: A5\"")));
    assert!(!notes.iter().any(|n| n.starts_with("Executing")));
}

#[test]
fn test_missing_command_file_blocks_round() {
    let catalog = catalog();
    let mut game = game_from_roster(&catalog, DUEL);
    let files = command_files(&[("Ajax", "1: A10")]);

    assert_eq!(game.missing_commands(&files), vec!["Bremen".to_string()]);
    let err = game.play_round(&catalog, &files).unwrap_err();
    assert!(matches!(err, GameError::MissingCommands { round: 1, .. }));
    assert_eq!(game.round(), 0);
    assert_eq!(ship(&game, "Ajax").vector.speed, 0);
}

// =============================================================================
// Combat
// =============================================================================

#[test]
fn test_starbase_destroys_ship_and_scores_once() {
    let catalog = catalog();
    let mut game = game_from_roster(
        &catalog,
        "Delos SB2531 Blue bob 0 0\nAjax H2527 Red alice 0 10\n",
    );
    let report = play(&mut game, &catalog, &[("Delos", "1: F L1 Ajax\n2: F L2 Ajax\n")]);

    assert_eq!(report.destroyed_names(), vec!["Ajax"]);
    assert!(game.graveyard().values().any(|e| e.name == "Ajax"));
    assert!(!game.commandable_names().contains(&"Ajax".to_string()));

    // shield 100/2 + 25 break bonus + 100 hull + 100 killing blow
    assert_eq!(report.score_deltas.get("Delos"), Some(&275));
    assert_eq!(report.score_deltas.get("Ajax"), Some(&0));

    // a dead ship no longer needs orders
    let report = play(&mut game, &catalog, &[]);
    assert_eq!(report.round, 2);
    assert!(report.destroyed.is_empty());
}

#[test]
fn test_score_breakdown_by_tick() {
    let catalog = catalog();
    let mut game = game_from_roster(
        &catalog,
        "Ajax H2527 Red alice 0 0\nBremen H2552 Blue bob 0 30\n",
    );
    play(&mut game, &catalog, &[("Ajax", "3: F L1 Bremen\n")]);

    let ajax = ship(&game, "Ajax");
    let by_tick = ajax.history.score_by_tick(ajax.id);
    assert_eq!(by_tick.get(&Tick::new(1, 3)), Some(&105));
    assert_eq!(by_tick.values().sum::<i32>(), ajax.score());
}

#[test]
fn test_same_faction_hits_do_not_score() {
    let catalog = catalog();
    let mut game = game_from_roster(
        &catalog,
        "Ajax H2527 Red alice 0 0\nBremen H2552 Red bob 0 30\n",
    );
    play(&mut game, &catalog, &[("Ajax", "1: F L1 Bremen\n")]);

    assert_eq!(ship(&game, "Ajax").score(), 0);
    assert!(ship(&game, "Bremen").hull < 110);
}

#[test]
fn test_boost_absorbs_laser_then_dissipates() {
    let catalog = catalog();
    let mut game = game_from_roster(
        &catalog,
        "Ajax H2527 Red alice 0 0\nBremen H2552 Blue bob 0 30\n",
    );
    play(
        &mut game,
        &catalog,
        &[("Ajax", "2: F L1 Bremen\n"), ("Bremen", "1: Boost S 100\n")],
    );

    let bremen = ship(&game, "Bremen");
    // boosted to 240, then hit for 150
    assert_eq!(bremen.shields().unwrap().strengths.get(Quadrant::S), 90);
    assert_eq!(bremen.hull, 110);
}

// =============================================================================
// Starbases and payloads
// =============================================================================

#[test]
fn test_replenish_restores_ammo() {
    let catalog = catalog();
    let mut game = game_from_roster(
        &catalog,
        "Delos SB2531 Red alice 0 0\nAjax H2545 Red alice 0 5\n",
    );
    play(&mut game, &catalog, &[("Ajax", "1: F R1 180\n2: F R1 180\n")]);
    play(&mut game, &catalog, &[("Ajax", "1: Replenish\n")]);

    let ajax = ship(&game, "Ajax");
    assert!(matches!(
        ajax.weapons.get("R1").map(|c| &c.kind),
        Some(ComponentKind::Launcher(l)) if l.ammo == l.initial_load
    ));
    assert!(notes(ship(&game, "Delos")).iter().any(|n| n == "Replenished Ajax."));
}

#[test]
fn test_starbase_ignores_movement_orders() {
    let catalog = catalog();
    let mut game = game_from_roster(&catalog, "Delos SB2531 Red alice 0 0\n");
    play(&mut game, &catalog, &[("Delos", "1: A0\n2: R30\n")]);

    let delos = ship(&game, "Delos");
    assert_eq!(delos.vector, Vector::new(Point::ORIGIN, 0.0, 0));
    let notes = notes(delos);
    assert!(notes.iter().any(|n| n == "Starbases can not accelerate."));
    assert!(notes.iter().any(|n| n == "Starbases can not turn."));
}

#[test]
fn test_rocket_hits_and_leaves_the_arena() {
    let catalog = catalog();
    let mut game = game_from_roster(&catalog, DUEL);
    let report = play(&mut game, &catalog, &[("Ajax", "1: F R1 0\n")]);

    // 300 away at 60 per tick: detonates within range of Bremen
    assert!(report.destroyed_names().contains(&"Ajax-Rocket-R1-1"));
    let bremen = ship(&game, "Bremen");
    assert!(bremen
        .history
        .iter()
        .flat_map(|(_, entry)| entry.events.iter())
        .any(|e| e.as_hit().map_or(false, |h| h.source_name == "Ajax-Rocket-R1-1")));
    assert!(ship(&game, "Ajax").score() > 0);
}
