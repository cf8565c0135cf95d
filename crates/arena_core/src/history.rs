//! Per-entity record of every tick.
//!
//! Each entity owns a [`History`]: one [`TickHistory`] per tick holding the
//! entity's state at the end of that tick and the events it saw. Reports are
//! generated from these alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::events::Event;
use crate::math::Point;
use crate::math::{fixed_serde, Fixed};
use crate::tick::Tick;

/// State of an entity at one moment, as reported to players.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Entity name.
    pub name: String,
    /// Position.
    pub pos: Point,
    /// Heading in degrees.
    #[serde(with = "fixed_serde")]
    pub heading: Fixed,
    /// Speed.
    pub speed: i32,
    /// Hull points.
    pub hull: i32,
    /// Battery charge.
    pub battery: i32,
    /// Visibility, 0 to 100.
    pub visibility: u8,
    /// Score of the owning ship (0 for projectiles).
    pub score: i32,
    /// Status lines per component name.
    pub components: BTreeMap<String, BTreeMap<String, String>>,
    /// Locked target of a guided missile.
    pub target: Option<String>,
}

/// What happened to one entity during one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickHistory {
    /// State at the end of the tick.
    pub data: Snapshot,
    /// Events in the order they happened.
    pub events: Vec<Event>,
}

/// Tick-indexed history of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    current: Tick,
    ticks: BTreeMap<Tick, TickHistory>,
}

impl History {
    /// Start a history at `tick` with the entity's initial state.
    #[must_use]
    pub fn new(tick: Tick, snapshot: Snapshot) -> Self {
        let mut ticks = BTreeMap::new();
        ticks.insert(
            tick,
            TickHistory {
                data: snapshot,
                events: Vec::new(),
            },
        );
        Self {
            current: tick,
            ticks,
        }
    }

    /// Tick events are currently recorded against.
    #[must_use]
    pub fn current_tick(&self) -> Tick {
        self.current
    }

    /// Store the final state of the current tick and open `tick`.
    pub fn set_tick(&mut self, tick: Tick, snapshot: Snapshot) {
        self.update(snapshot.clone());
        self.current = tick;
        self.ticks.entry(tick).or_insert(TickHistory {
            data: snapshot,
            events: Vec::new(),
        });
    }

    /// Overwrite the current tick's state.
    pub fn update(&mut self, snapshot: Snapshot) {
        match self.ticks.get_mut(&self.current) {
            Some(entry) => entry.data = snapshot,
            None => {
                self.ticks.insert(
                    self.current,
                    TickHistory {
                        data: snapshot,
                        events: Vec::new(),
                    },
                );
            }
        }
    }

    /// Append an event to the current tick.
    pub fn add_event(&mut self, event: Event) {
        if let Some(entry) = self.ticks.get_mut(&self.current) {
            entry.events.push(event);
        }
    }

    /// Drop everything and start over at `tick` with one snapshot.
    ///
    /// Used at round boundaries; `tick` is the last tick of the previous round.
    pub fn reset(&mut self, tick: Tick, snapshot: Snapshot) {
        *self = Self::new(tick, snapshot);
    }

    /// Recorded entry for `tick`.
    #[must_use]
    pub fn get(&self, tick: Tick) -> Option<&TickHistory> {
        self.ticks.get(&tick)
    }

    /// Entry for the current tick.
    #[must_use]
    pub fn current(&self) -> Option<&TickHistory> {
        self.ticks.get(&self.current)
    }

    /// Events of the current tick.
    #[must_use]
    pub fn current_events(&self) -> &[Event] {
        self.current().map_or(&[], |t| t.events.as_slice())
    }

    /// All recorded ticks in order.
    pub fn iter(&self) -> impl Iterator<Item = (&Tick, &TickHistory)> {
        self.ticks.iter()
    }

    /// Number of recorded ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Points earned per tick by hits credited to `owner`.
    #[must_use]
    pub fn score_by_tick(&self, owner: EntityId) -> BTreeMap<Tick, i32> {
        self.ticks
            .iter()
            .map(|(tick, entry)| {
                let total = entry
                    .events
                    .iter()
                    .filter_map(Event::as_hit)
                    .filter(|hit| hit.owner == owner)
                    .map(|hit| hit.score)
                    .sum();
                (*tick, total)
            })
            .collect()
    }
}
