//! Starting positions for a new game.
//!
//! A roster is plain text, one ship per line:
//!
//! ```text
//! Name    Type   Faction  Player  X    Y
//! Ajax    H2545  Red      alice   0    0
//! Bremen  H2552  Blue     bob     120  -40
//! ```
//!
//! Blank lines, `#` comments and a header line starting with `Name` are ignored.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::FactionId;
use crate::math::Point;

/// One ship in a roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Ship name, unique in the game.
    pub name: String,
    /// Ship class designation, e.g. `H2545`.
    pub class: String,
    /// Faction the ship flies for.
    pub faction: FactionId,
    /// Controlling player.
    pub player: String,
    /// Starting position.
    pub pos: Point,
}

/// Parse a roster. `source_name` is used in error messages.
pub fn parse_roster(text: &str, source_name: &str) -> Result<Vec<RosterEntry>> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields[0] == "Name" {
            continue;
        }
        let parse_error = |message: String| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: format!("line {}: {message}", index + 1),
        };
        let [name, class, faction, player, x, y] = fields.as_slice() else {
            return Err(parse_error(format!(
                "expected 6 fields (Name Type Faction Player X Y), got {}",
                fields.len()
            )));
        };
        let coordinate = |token: &str| {
            token
                .parse::<f64>()
                .map_err(|_| parse_error(format!("{token} is not a coordinate")))
        };
        entries.push(RosterEntry {
            name: (*name).to_string(),
            class: (*class).to_string(),
            faction: FactionId::new(*faction),
            player: (*player).to_string(),
            pos: Point::from_f64(coordinate(x)?, coordinate(y)?),
        });
    }
    Ok(entries)
}
