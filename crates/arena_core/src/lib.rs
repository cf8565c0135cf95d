//! # Arena Core
//!
//! Deterministic round/tick engine for Starship Arena.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (the built-in catalog is compiled in)
//! - No randomness, no wall clock
//! - Positions and headings in fixed point
//!
//! Players submit one command file per ship per round. The engine validates
//! the files, plays ten ticks and records everything each ship saw and did in
//! its history, from which reports are written.
//!
//! ## Crate Structure
//!
//! - [`command`] - Command file parsing and validation
//! - [`components`] - Shields, weapons and ECM
//! - [`entity`] - Ships, starbases, missiles and mines
//! - [`combat`] - Damage resolution and scoring
//! - [`round`] - The tick-phase scheduler
//! - [`game`] - Setup, multi-round play and persistence
//! - [`data`] - Ship catalog and rosters
//! - [`math`] - Fixed-point geometry

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod command;
pub mod components;
pub mod data;
pub mod entity;
pub mod error;
pub mod events;
pub mod factions;
pub mod game;
pub mod history;
pub mod math;
pub mod parameters;
pub mod replay;
pub mod round;
pub mod tick;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::command::{parse_commands, Action, Command, CommandSet, ParsedCommands};
    pub use crate::components::{Component, ComponentKind, Quadrant};
    pub use crate::data::{parse_roster, Catalog, RosterEntry, Rules};
    pub use crate::entity::{Commandable, Entity, EntityId, EntityKind, EntityStorage, Replenisher};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{DamageType, Event, HitEvent, ScanEvent};
    pub use crate::factions::FactionId;
    pub use crate::game::{Game, RoundReport};
    pub use crate::math::{Fixed, Point, Vector};
    pub use crate::replay::RoundRecord;
    pub use crate::tick::{Tick, TICKS_PER_ROUND, TICK_ZERO};
}
