//! Static game data: ship and payload classes, starting rosters.
//!
//! **Note:** This module contains no file IO. Callers read files and hand
//! the text over; only the built-in catalog is embedded at compile time.

mod catalog;
mod roster;

pub use catalog::{
    Catalog, ComponentSpec, PayloadClass, PayloadKind, Rules, ShipClass, BUILTIN_CATALOG,
};
pub use roster::{parse_roster, RosterEntry};
