//! Pre-submission command file checks.

use arena_core::command::{parse_commands, LineFeedback};
use arena_core::data::{parse_roster, Catalog};
use arena_core::error::GameError;
use arena_core::game::Game;

use crate::Result;

/// Outcome of checking one ship's command file.
#[derive(Debug, Clone)]
pub struct Validation {
    /// Ship the file was checked for.
    pub ship: String,
    /// Feedback for every non-blank line, in file order.
    pub lines: Vec<LineFeedback>,
}

impl Validation {
    /// Whether every line will be executed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lines.iter().all(|l| l.is_valid)
    }

    /// One human-readable line per command line.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| {
                let status = if l.is_valid { "ok" } else { "INVALID" };
                if l.messages.is_empty() {
                    format!("{:>3} {status:<7} {}", l.line, l.text)
                } else {
                    format!("{:>3} {status:<7} {}: {}", l.line, l.text, l.messages.join(" "))
                }
            })
            .collect()
    }
}

/// Check `commands` for `ship` in the game set up from `roster`.
///
/// Targets are resolved against every ship on the roster.
///
/// # Errors
///
/// Returns an error if the roster does not set up or `ship` is not on it.
pub fn validate_commands(
    catalog: &Catalog,
    roster: &str,
    ship: &str,
    commands: &str,
) -> Result<Validation> {
    let entries = parse_roster(roster, "roster")?;
    let game = Game::setup(catalog, &entries)?;
    let entity = game
        .entity_by_name(ship)
        .ok_or_else(|| GameError::EntityNotFound(ship.to_string()))?;

    let parsed = parse_commands(commands, entity, &game.entities().names());
    let validation = Validation {
        ship: ship.to_string(),
        lines: parsed.feedback(),
    };
    tracing::debug!(
        ship,
        lines = validation.lines.len(),
        valid = validation.is_valid(),
        "Validated command file"
    );
    Ok(validation)
}
