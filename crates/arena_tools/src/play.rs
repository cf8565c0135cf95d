//! Local round runner.
//!
//! Command files live in one directory, named `<ship>-commands-<round>.txt`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arena_core::data::{parse_roster, Catalog};
use arena_core::entity::Entity;
use arena_core::game::{Game, RoundReport};
use serde::Serialize;

use crate::{read_text, Result};

/// Path of the command file for `ship` in `round`.
#[must_use]
pub fn command_file_path(dir: &Path, ship: &str, round: u32) -> PathBuf {
    dir.join(format!("{ship}-commands-{round}.txt"))
}

/// Command files for the next round of `game`. Ships without a file are left
/// out so the engine can report them.
///
/// # Errors
///
/// Returns [`crate::ToolError::Io`] if a file exists but cannot be read.
pub fn load_command_files(game: &Game, dir: &Path) -> Result<BTreeMap<String, String>> {
    let round = game.next_round();
    let mut files = BTreeMap::new();
    for ship in game.commandable_names() {
        let path = command_file_path(dir, &ship, round);
        if !path.exists() {
            tracing::warn!(ship = %ship, round, path = %path.display(), "No command file");
            continue;
        }
        files.insert(ship, read_text(&path)?);
    }
    Ok(files)
}

/// Set up a game from `roster` and play `rounds` rounds from `dir`.
///
/// # Errors
///
/// Stops at the first round that cannot be played, for example because a
/// command file is missing.
pub fn run(
    catalog: &Catalog,
    roster: &str,
    dir: &Path,
    rounds: u32,
) -> Result<(Game, Vec<RoundReport>)> {
    let entries = parse_roster(roster, "roster")?;
    let mut game = Game::setup(catalog, &entries)?;
    let mut reports = Vec::new();
    for _ in 0..rounds {
        let files = load_command_files(&game, dir)?;
        let report = game.play_round(catalog, &files)?;
        tracing::info!(
            round = report.round,
            destroyed = report.destroyed.len(),
            hash = report.state_hash,
            "Round played"
        );
        reports.push(report);
    }
    Ok((game, reports))
}

/// Plain-text summary of the played rounds.
#[must_use]
pub fn summary(game: &Game, reports: &[RoundReport]) -> Vec<String> {
    let mut out = Vec::new();
    for report in reports {
        out.push(format!("Round {} (state {:016x})", report.round, report.state_hash));
        for name in report.destroyed_names() {
            out.push(format!("  destroyed: {name}"));
        }
        for (ship, delta) in report.score_deltas.iter().filter(|(_, d)| **d != 0) {
            out.push(format!("  {ship}: +{delta}"));
        }
    }
    out.push("Scores".to_string());
    for (ship, score) in game.scores() {
        out.push(format!("  {ship}: {score}"));
    }
    out
}

/// JSON view of one entity's history.
#[derive(Debug, Clone, Serialize)]
pub struct ShipLog {
    /// Entity name.
    pub name: String,
    /// Class designation.
    pub class: String,
    /// Faction.
    pub faction: String,
    /// Final score.
    pub score: i32,
    /// Final hull.
    pub hull: i32,
    /// Final battery.
    pub battery: i32,
    /// Whether the entity is in the graveyard.
    pub destroyed: bool,
    /// Events per tick, ticks written `round.tick`.
    pub ticks: Vec<TickLog>,
}

/// Events of one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickLog {
    /// Tick, written `round.tick`.
    pub tick: String,
    /// Position at the end of the tick.
    pub pos: (f64, f64),
    /// Events as shown in reports.
    pub events: Vec<String>,
}

impl ShipLog {
    fn new(entity: &Entity, destroyed: bool) -> Self {
        Self {
            name: entity.name.clone(),
            class: entity.class.clone(),
            faction: entity.faction.to_string(),
            score: entity.score(),
            hull: entity.hull,
            battery: entity.battery,
            destroyed,
            ticks: entity
                .history
                .iter()
                .map(|(tick, entry)| TickLog {
                    tick: tick.to_string(),
                    pos: entry.data.pos.as_f64(),
                    events: entry.events.iter().map(ToString::to_string).collect(),
                })
                .collect(),
        }
    }
}

/// Histories of every commandable entity, live ones first.
#[must_use]
pub fn ship_logs(game: &Game) -> Vec<ShipLog> {
    let live = game
        .entities()
        .iter()
        .filter(|(_, e)| e.is_commandable())
        .map(|(_, e)| ShipLog::new(e, false));
    let dead = game.graveyard().values().map(|e| ShipLog::new(e, true));
    live.chain(dead).collect()
}

/// The histories as pretty JSON.
///
/// # Errors
///
/// Returns [`crate::ToolError::Json`] if encoding fails.
pub fn histories_json(game: &Game) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ship_logs(game))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolError;
    use arena_core::error::GameError;

    const ROSTER: &str = "Ajax H2527 Red alice 0 0\nBremen H2552 Blue bob 0 30\n";

    fn write(dir: &Path, ship: &str, round: u32, text: &str) {
        std::fs::write(command_file_path(dir, ship, round), text).unwrap();
    }

    #[test]
    fn test_command_file_path() {
        let path = command_file_path(Path::new("orders"), "Ajax", 3);
        assert_eq!(path, Path::new("orders/Ajax-commands-3.txt"));
    }

    #[test]
    fn test_runs_rounds_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Ajax", 1, "1: F L1 Bremen\n");
        write(dir.path(), "Bremen", 1, "");
        write(dir.path(), "Ajax", 2, "");
        write(dir.path(), "Bremen", 2, "1: A5\n");

        let catalog = Catalog::builtin().unwrap();
        let (game, reports) = run(&catalog, ROSTER, dir.path(), 2).unwrap();
        assert_eq!(game.round(), 2);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].score_deltas.get("Ajax"), Some(&105));

        let text = summary(&game, &reports);
        assert!(text.iter().any(|l| l == "  Ajax: +105"));
        assert!(text.iter().any(|l| l == "  Ajax: 105"));
    }

    #[test]
    fn test_missing_file_stops_run() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Ajax", 1, "1: A10\n");

        let catalog = Catalog::builtin().unwrap();
        let err = run(&catalog, ROSTER, dir.path(), 1).unwrap_err();
        assert!(matches!(
            err,
            ToolError::Game(GameError::MissingCommands { round: 1, .. })
        ));
    }

    #[test]
    fn test_histories_json() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Ajax", 1, "1: A10\n");
        write(dir.path(), "Bremen", 1, "");

        let catalog = Catalog::builtin().unwrap();
        let (game, _) = run(&catalog, ROSTER, dir.path(), 1).unwrap();
        let json: serde_json::Value = serde_json::from_str(&histories_json(&game).unwrap()).unwrap();
        let ships = json.as_array().unwrap();
        assert_eq!(ships.len(), 2);
        assert_eq!(ships[0]["name"], "Ajax");
        assert_eq!(ships[0]["ticks"].as_array().unwrap().len(), 11);
        assert_eq!(ships[0]["ticks"][1]["tick"], "1.1");
    }
}
