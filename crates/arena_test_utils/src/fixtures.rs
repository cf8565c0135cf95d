//! Test fixtures and helpers.
//!
//! Pre-built games and scripted command files for consistent testing.
//! Fixtures panic on bad setup: they are only used from tests and benches.

use std::collections::BTreeMap;

use arena_core::data::{parse_roster, Catalog};
use arena_core::game::{Game, RoundReport};

/// The built-in catalog.
///
/// # Panics
///
/// Panics if the built-in catalog does not load.
#[must_use]
pub fn catalog() -> Catalog {
    Catalog::builtin().expect("built-in catalog loads")
}

/// A game set up from roster text.
///
/// # Panics
///
/// Panics if the roster is invalid.
#[must_use]
pub fn game_from_roster(catalog: &Catalog, roster: &str) -> Game {
    let roster = parse_roster(roster, "fixture roster").expect("fixture roster parses");
    Game::setup(catalog, &roster).expect("fixture roster sets up")
}

/// An empty command file for every commandable ship.
#[must_use]
pub fn idle_files(game: &Game) -> BTreeMap<String, String> {
    game.commandable_names()
        .into_iter()
        .map(|name| (name, String::new()))
        .collect()
}

/// Command files from `(ship, text)` pairs.
#[must_use]
pub fn command_files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(name, text)| ((*name).to_string(), (*text).to_string()))
        .collect()
}

/// A game plus the command files for each of its upcoming rounds.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Catalog the game is played with.
    pub catalog: Catalog,
    /// The game.
    pub game: Game,
    /// Command files for round 1, 2, ... Ships without a file stay idle.
    pub rounds: Vec<BTreeMap<String, String>>,
}

impl Scenario {
    /// Command files for the next round, idle for anyone not scripted.
    #[must_use]
    pub fn next_files(&self) -> BTreeMap<String, String> {
        let mut files = idle_files(&self.game);
        let index = self.game.round() as usize;
        if let Some(scripted) = self.rounds.get(index) {
            for (name, text) in scripted {
                if files.contains_key(name) {
                    files.insert(name.clone(), text.clone());
                }
            }
        }
        files
    }

    /// Play the next round.
    ///
    /// # Panics
    ///
    /// Panics if the round fails.
    pub fn play_next(&mut self) -> RoundReport {
        let files = self.next_files();
        self.game
            .play_round(&self.catalog, &files)
            .expect("scenario round plays")
    }

    /// Play `rounds` rounds, returning every report.
    pub fn play(&mut self, rounds: u32) -> Vec<RoundReport> {
        (0..rounds).map(|_| self.play_next()).collect()
    }
}

/// Two idle ships 100 apart. Nothing happens.
#[must_use]
pub fn idle_duel() -> Scenario {
    let catalog = catalog();
    let game = game_from_roster(
        &catalog,
        "Ajax H2545 Red alice 0 0\nBremen H2552 Blue bob 0 100\n",
    );
    Scenario {
        catalog,
        game,
        rounds: Vec::new(),
    }
}

/// Two ships close in on each other and trade lasers and rockets.
#[must_use]
pub fn laser_duel() -> Scenario {
    let catalog = catalog();
    let game = game_from_roster(
        &catalog,
        "Ajax H2527 Red alice 0 0\nBremen H2552 Blue bob 0 150\n",
    );
    let rounds = vec![
        command_files(&[
            ("Ajax", "1: A10\n2: F L1 Bremen\n4: F L2 Bremen\n6: F R1 0\n"),
            ("Bremen", "1: R90\n2: L90\n3: F L1 Ajax\n5: Boost S 50\n"),
        ]),
        command_files(&[
            ("Ajax", "1: F L1 Bremen\n1: F L2 Bremen\n3: H180\n5: A-10\n"),
            ("Bremen", "1: F S1 180\n2: Activation C1 on\n8: Activation C1 off\n"),
        ]),
    ];
    Scenario {
        catalog,
        game,
        rounds,
    }
}

/// A crowded fight: missiles, mines, a starbase and a cloaked ship.
#[must_use]
pub fn melee() -> Scenario {
    let catalog = catalog();
    let game = game_from_roster(
        &catalog,
        "\
Name Type Faction Player X Y
Ajax H2545 Red alice 0 0
Bremen H2552 Blue bob 60 60
Corinth H2535 Green carol -60 40
Delos SB2531 Red alice 0 -40
",
    );
    let rounds = vec![
        command_files(&[
            ("Ajax", "1: A20\n2: F S1 45\n3: F M1 0\n5: F E1 30\n7: F G 45 60\n"),
            ("Bremen", "1: L135\n1: A15\n2: F N1 0\n4: F L1 Ajax\n6: F S1 180\n"),
            ("Corinth", "1: R90\n2: F SS1 90\n2: F N1 0\n3: Activation Cloak on\n"),
            ("Delos", "1: F S1 0\n3: F L1 Bremen\n4: Boost N 200\n"),
        ]),
        command_files(&[
            ("Ajax", "1: H180\n1: A-20\n9: Replenish\n"),
            ("Bremen", "1: F R1 0\n2: F L1 Corinth\n"),
            ("Corinth", "1: A10\n4: F SP1 270\n"),
            ("Delos", "2: F R1 90\n5: F L2 Corinth\n"),
        ]),
    ];
    Scenario {
        catalog,
        game,
        rounds,
    }
}
